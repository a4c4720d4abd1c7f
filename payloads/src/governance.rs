//! Governance actions addressed to the core messaging contract and the token bridge.
//!
//! Every action starts with a 32-byte module name (left-padded with zeroes), a one-byte action id
//! and the chain the action targets (0 for all chains). Module and action decode to their names.

use binlayout_codec::{Field, Item, Layout};

/// Size of a module name.
pub const MODULE_SIZE: usize = 32;

const fn module_name<const N: usize>(name: &[u8]) -> [u8; N] {
    let mut padded = [0u8; N];
    let mut i = 0;
    while i < name.len() {
        padded[N - name.len() + i] = name[i];
        i += 1;
    }
    padded
}

/// Module of the core messaging contract.
pub const CORE: &str = "Core";

/// Module of the token bridge.
pub const TOKEN_BRIDGE: &str = "TokenBridge";

/// Padded module name of the core messaging contract.
pub const CORE_MODULE: [u8; MODULE_SIZE] = module_name(CORE.as_bytes());

/// Padded module name of the token bridge.
pub const TOKEN_BRIDGE_MODULE: [u8; MODULE_SIZE] = module_name(TOKEN_BRIDGE.as_bytes());

fn header(module: &str, padded: [u8; MODULE_SIZE], action: u8, name: &str) -> Vec<Field> {
    vec![
        Field::new("module", Item::bytes(MODULE_SIZE).fixed_conversion(module, padded)),
        Field::new("action", Item::uint(1).fixed_conversion(name, action)),
        Field::new("chain", Item::uint(2)),
    ]
}

fn action(
    module: &str,
    padded: [u8; MODULE_SIZE],
    id: u8,
    name: &str,
    body: impl IntoIterator<Item = Field>,
) -> Layout {
    let mut fields = header(module, padded, id, name);
    fields.extend(body);
    Layout::Fields(fields)
}

/// Replaces the core contract implementation.
pub fn core_contract_upgrade() -> Layout {
    action(
        CORE,
        CORE_MODULE,
        1,
        "ContractUpgrade",
        [Field::new("new_contract", Item::bytes(32))],
    )
}

/// Installs a new guardian set.
pub fn guardian_set_upgrade() -> Layout {
    action(
        CORE,
        CORE_MODULE,
        2,
        "GuardianSetUpgrade",
        [
            Field::new("new_guardian_set_index", Item::uint(4)),
            Field::new("new_guardian_set", Item::prefixed_array(1, Item::bytes(20))),
        ],
    )
}

/// Sets the fee charged for publishing a message.
pub fn set_message_fee() -> Layout {
    action(
        CORE,
        CORE_MODULE,
        3,
        "SetMessageFee",
        [Field::new("fee", Item::uint(32))],
    )
}

/// Transfers collected fees to a recipient.
pub fn transfer_fees() -> Layout {
    action(
        CORE,
        CORE_MODULE,
        4,
        "TransferFees",
        [
            Field::new("amount", Item::uint(32)),
            Field::new("recipient", Item::bytes(32)),
        ],
    )
}

/// Updates the chain id after a fork of an EVM chain.
pub fn recover_chain_id() -> Layout {
    action(
        CORE,
        CORE_MODULE,
        5,
        "RecoverChainId",
        [
            Field::new("evm_chain_id", Item::uint(32)),
            Field::new("new_chain_id", Item::uint(2)),
        ],
    )
}

/// Registers the token bridge emitter of another chain.
pub fn register_chain() -> Layout {
    action(
        TOKEN_BRIDGE,
        TOKEN_BRIDGE_MODULE,
        1,
        "RegisterChain",
        [
            Field::new("emitter_chain", Item::uint(2)),
            Field::new("emitter_address", Item::bytes(32)),
        ],
    )
}

/// Replaces the token bridge implementation.
pub fn token_bridge_contract_upgrade() -> Layout {
    action(
        TOKEN_BRIDGE,
        TOKEN_BRIDGE_MODULE,
        2,
        "ContractUpgrade",
        [Field::new("new_contract", Item::bytes(32))],
    )
}
