use binlayout_codec::{
    deserialize, deserialize_at, deserialize_cfg, serialize, size, static_size, Case, Error,
    Field, Item, Layout, ReadCfg, Value,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use test_case::test_case;

fn message() -> Layout {
    Layout::fields([
        Field::omitted("version", Item::uint(1).fixed(7)),
        Field::new("items", Item::prefixed_bytes(2)),
    ])
}

fn action() -> Item {
    Item::switch(
        1,
        [
            Case::new(0, [Field::new("a", Item::uint(2))]).labeled("A"),
            Case::new(1, [Field::new("b", Item::prefixed_bytes(1))]).labeled("B"),
        ],
    )
}

#[test]
fn test_message_scenario() {
    let value = Value::object().with("items", &[0xAA, 0xBB][..]);
    let encoded = serialize(&message(), &value).unwrap();
    assert_eq!(&encoded[..], &[0x07, 0x00, 0x02, 0xAA, 0xBB]);
    assert_eq!(size(&message(), &value).unwrap(), 5);
    assert_eq!(deserialize(&message(), &encoded).unwrap(), value);

    // A wrong version is rejected
    let err = deserialize(&message(), &[0x08, 0x00, 0x02, 0xAA, 0xBB]).unwrap_err();
    assert!(matches!(err.root(), Error::ValueMismatch(_)));
}

#[test]
fn test_consume_all() {
    let err = deserialize(&message(), &[0x07, 0x00, 0x00, 0xFF]).unwrap_err();
    assert_eq!(err, Error::ExtraData(1));

    let (value, end) = deserialize_at(&message(), &[0x07, 0x00, 0x00, 0xFF], 0).unwrap();
    assert_eq!(end, 3);
    assert_eq!(value.get("items").unwrap().as_bytes().unwrap().len(), 0);
}

#[test_case(&[0x00, 0x01, 0x02], Value::object().with("id", "A").with("a", 0x0102u16); "first case")]
#[test_case(&[0x01, 0x01, 0xFF], Value::object().with("id", "B").with("b", &[0xFF][..]); "second case")]
fn test_switch_cases(encoded: &[u8], value: Value) {
    let layout = Layout::Item(action());
    assert_eq!(deserialize(&layout, encoded).unwrap(), value);
    assert_eq!(&serialize(&layout, &value).unwrap()[..], encoded);
}

#[test]
fn test_switch_unknown_id() {
    let layout = Layout::Item(action());
    let err = deserialize(&layout, &[0x02, 0x00, 0x00]).unwrap_err();
    assert!(matches!(err.root(), Error::UnknownDiscriminant(_)));

    let value = Value::object().with("id", 2u8).with("a", 1u8);
    let err = serialize(&layout, &value).unwrap_err();
    assert!(matches!(err.root(), Error::UnknownDiscriminant(_)));
}

#[test_case(Item::int(4), Value::from(-1), &[0xFF, 0xFF, 0xFF, 0xFF]; "negative")]
#[test_case(Item::uint(2).little_endian(), Value::from(0x0102), &[0x02, 0x01]; "little endian")]
#[test_case(Item::int(2).little_endian(), Value::from(-2), &[0xFE, 0xFF]; "signed little endian")]
fn test_endianness(item: Item, value: Value, expected: &[u8]) {
    let layout = Layout::Item(item);
    let encoded = serialize(&layout, &value).unwrap();
    assert_eq!(&encoded[..], expected);
    assert_eq!(deserialize(&layout, &encoded).unwrap(), value);
}

#[test]
fn test_out_of_range() {
    let err = serialize(&Layout::Item(Item::uint(1)), &Value::from(256)).unwrap_err();
    assert!(matches!(err.root(), Error::EncodingRange(_)));
    let err = serialize(&Layout::Item(Item::uint(1)), &Value::from(-1)).unwrap_err();
    assert!(matches!(err.root(), Error::EncodingRange(_)));
    let err = serialize(&Layout::Item(Item::int(1)), &Value::from(128)).unwrap_err();
    assert!(matches!(err.root(), Error::EncodingRange(_)));
}

#[test]
fn test_array_boundaries() {
    let layout = Layout::Item(Item::prefixed_array(1, Item::uint(2)));

    // Count says two elements, only one present
    let err = deserialize(&layout, &[0x02, 0x00, 0x01]).unwrap_err();
    assert!(matches!(err.root(), Error::BufferBounds { .. }));

    let cfg = ReadCfg::default().with_array_len(..=1);
    let mut buf = &[0x02u8, 0x00, 0x01, 0x00, 0x02][..];
    let err = deserialize_cfg(&layout, &mut buf, &cfg).unwrap_err();
    assert_eq!(err, Error::LengthExceeded(2));

    let fixed = Layout::Item(Item::array(2, Item::uint(1)));
    let err = serialize(&fixed, &Value::from(vec![Value::from(1)])).unwrap_err();
    assert!(matches!(err.root(), Error::ValueMismatch(_)));
}

#[test]
fn test_static_size() {
    let layout = Layout::fields([
        Field::new("a", Item::uint(4)),
        Field::new("b", Item::array(3, Item::bytes(2))),
        Field::new("c", Item::fixed_bytes(&b"xyz"[..])),
    ]);
    assert_eq!(static_size(&layout).unwrap(), 13);
    assert!(matches!(
        static_size(&message()),
        Err(Error::SizeIndeterminate(_))
    ));
}

fn nested() -> Layout {
    Layout::fields([
        Field::new("n", Item::uint(3)),
        Field::new("s", Item::int(2).little_endian()),
        Field::new(
            "entries",
            Item::prefixed_array(
                1,
                Layout::fields([
                    Field::new("key", Item::bytes(4)),
                    Field::new("memo", Item::prefixed_bytes(1)),
                ]),
            ),
        ),
        Field::new("action", action()),
        Field::new("tail", Item::remainder_bytes()),
    ])
}

fn random_value(rng: &mut StdRng) -> Value {
    let random_bytes = |rng: &mut StdRng, len: usize| {
        let mut bytes = vec![0u8; len];
        rng.fill(&mut bytes[..]);
        bytes
    };
    let entries: Vec<Value> = (0..rng.gen_range(0..4))
        .map(|_| {
            let memo = rng.gen_range(0..8);
            Value::object()
                .with("key", random_bytes(rng, 4))
                .with("memo", random_bytes(rng, memo))
        })
        .collect();
    let action = if rng.gen_bool(0.5) {
        Value::object().with("id", "A").with("a", rng.gen::<u16>())
    } else {
        let len = rng.gen_range(0..16);
        Value::object().with("id", "B").with("b", random_bytes(rng, len))
    };
    let tail = rng.gen_range(0..8);
    Value::object()
        .with("n", rng.gen_range(0u32..1 << 24))
        .with("s", rng.gen::<i16>())
        .with("entries", entries)
        .with("action", action)
        .with("tail", random_bytes(rng, tail))
}

#[test]
fn test_random_roundtrip() {
    let mut rng = StdRng::seed_from_u64(0);
    let layout = nested();
    for _ in 0..256 {
        let value = random_value(&mut rng);
        let encoded = serialize(&layout, &value).unwrap();
        assert_eq!(encoded.len(), size(&layout, &value).unwrap());
        assert_eq!(deserialize(&layout, &encoded).unwrap(), value);
    }
}

#[test]
fn test_random_truncation() {
    let mut rng = StdRng::seed_from_u64(1);
    let layout = Layout::fields([
        Field::new("n", Item::uint(3)),
        Field::new("memo", Item::prefixed_bytes(1)),
        Field::new("action", action()),
    ]);
    for _ in 0..64 {
        let len = rng.gen_range(0..8);
        let mut memo = vec![0u8; len];
        rng.fill(&mut memo[..]);
        let value = Value::object()
            .with("n", rng.gen_range(0u32..1 << 24))
            .with("memo", memo)
            .with("action", Value::object().with("id", "A").with("a", 9u8));
        let encoded = serialize(&layout, &value).unwrap();
        let cut = rng.gen_range(0..encoded.len());
        assert!(deserialize(&layout, &encoded[..cut]).is_err());
    }
}

#[test]
fn test_tagged_message() {
    let layout = Layout::fields([
        Field::new("tag", Item::uint(1)),
        Field::new("payload", Item::prefixed_bytes(2)),
    ]);
    let value = Value::object()
        .with("tag", 7u8)
        .with("payload", &[0xAA, 0xBB][..]);
    let encoded = serialize(&layout, &value).unwrap();
    assert_eq!(&encoded[..], &[0x07, 0x00, 0x02, 0xAA, 0xBB]);

    let mut extra = encoded.to_vec();
    extra.push(0x00);
    assert_eq!(deserialize(&layout, &extra).unwrap_err(), Error::ExtraData(1));
}

#[test]
fn test_unlabeled_switch() {
    let layout = Layout::Item(Item::switch(
        1,
        [
            Case::new(0, [Field::new("a", Item::uint(1))]),
            Case::new(1, [Field::new("b", Item::uint(2))]),
        ],
    ));
    let value = Value::object().with("id", 0u8).with("a", 5u8);
    let encoded = serialize(&layout, &value).unwrap();
    assert_eq!(&encoded[..], &[0x00, 0x05]);
    assert_eq!(deserialize(&layout, &encoded).unwrap(), value);

    let value = Value::object().with("id", 2u8).with("a", 5u8);
    assert!(matches!(
        serialize(&layout, &value).unwrap_err().root(),
        Error::UnknownDiscriminant(_)
    ));
}

#[test]
fn test_fixed_array_count_on_read() {
    let layout = Layout::Item(Item::array(2, Item::uint(1)));
    assert_eq!(
        deserialize(&layout, &[0x01, 0x02, 0x03]).unwrap_err(),
        Error::ExtraData(1)
    );
    assert!(matches!(
        deserialize(&layout, &[0x01]).unwrap_err().root(),
        Error::BufferBounds { .. }
    ));
}

#[test]
fn test_zero_size_elements_need_fixed_count() {
    // A four byte count would otherwise yield billions of empty elements
    let layout = Layout::Item(Item::prefixed_array(4, Item::bytes(0)));
    assert!(matches!(
        deserialize(&layout, &[0xFF; 4]).unwrap_err(),
        Error::Schema(_)
    ));
    assert!(matches!(
        serialize(&layout, &Value::Array(vec![])).unwrap_err(),
        Error::Schema(_)
    ));

    let layout = Layout::Item(Item::array(3, Item::bytes(0)));
    let value = deserialize(&layout, &[]).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 3);
}
