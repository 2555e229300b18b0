//! Ambient type-declaration synthesis for the editor host.
//!
//! Each regeneration produces the complete declaration set: the active
//! library's built-in preamble plus one `declare var` block per bound
//! contract. The host replaces its registered declarations wholesale.
//! Output is byte-deterministic: records render in selection-map order,
//! entries in interface source order.

use alloy_json_abi::StateMutability;

use crate::binding::LibraryFlavor;
use crate::interface::{ContractInterface, InterfaceItem};
use crate::selection::Selection;

/// Built-in ambient declarations for the web3-style surface.
pub const WEB3_BASE_DECLARATIONS: &str = "\
interface TransactionConfig { from?: string; gasPrice?: string; gas?: number; value?: number | string }
interface CallOptions { from?: string; gasPrice?: string; gas?: number }
declare interface Contract {
  options: { address: string; jsonInterface: object[] }
  methods: any
}
declare class Web3 {
  eth: any
  utils: any
}
declare var web3: Web3
";

/// Built-in ambient declarations for the ethers-style surface.
pub const ETHERS_BASE_DECLARATIONS: &str = "\
declare class BigNumber {
  toString(): string
  toNumber(): number
  toHexString(): string
}
interface ContractTransaction { hash: string; wait(confirmations?: number): Promise<any> }
interface PopulatedTransaction { to?: string; from?: string; data?: string; value?: BigNumber }
interface EventFilter { address?: string; topics?: Array<string | Array<string>> }
declare interface Contract {
  address: string
  interface: any
  connect(provider: any): Contract
}
declare var ethers: any
declare var provider: any
";

pub fn base_declarations(flavor: LibraryFlavor) -> &'static str {
    match flavor {
        LibraryFlavor::Web3 => WEB3_BASE_DECLARATIONS,
        LibraryFlavor::Ethers => ETHERS_BASE_DECLARATIONS,
    }
}

/// Build the full declaration text for the current selection.
pub fn synthesize_declarations(
    base: &str,
    selection: &Selection,
    flavor: LibraryFlavor,
) -> String {
    let mut out = String::from(base);
    for record in selection.values().filter(|r| r.is_bound()) {
        let Some(interface) = &record.interface else {
            continue;
        };
        out.push('\n');
        out.push_str(&contract_declaration(&record.name, interface, flavor));
    }
    out
}

fn contract_declaration(
    name: &str,
    interface: &ContractInterface,
    flavor: LibraryFlavor,
) -> String {
    match flavor {
        LibraryFlavor::Web3 => web3_declaration(name, interface),
        LibraryFlavor::Ethers => ethers_declaration(name, interface),
    }
}

struct DeclaredEntry<'a> {
    name: &'a str,
    params: Vec<(&'a str, &'a str)>,
    constant: bool,
}

/// Named non-constructor entries, in source order.
fn declared_entries(interface: &ContractInterface) -> Vec<DeclaredEntry<'_>> {
    interface
        .items()
        .iter()
        .filter_map(|item| match item {
            InterfaceItem::Function(f) => Some(DeclaredEntry {
                name: &f.name,
                params: f
                    .inputs
                    .iter()
                    .map(|p| (p.name.as_str(), p.ty.as_str()))
                    .collect(),
                constant: matches!(
                    f.state_mutability,
                    StateMutability::Pure | StateMutability::View
                ),
            }),
            InterfaceItem::Event(e) => Some(DeclaredEntry {
                name: &e.name,
                params: e
                    .inputs
                    .iter()
                    .map(|p| (p.name.as_str(), p.ty.as_str()))
                    .collect(),
                constant: false,
            }),
            InterfaceItem::Error(e) => Some(DeclaredEntry {
                name: &e.name,
                params: e
                    .inputs
                    .iter()
                    .map(|p| (p.name.as_str(), p.ty.as_str()))
                    .collect(),
                constant: false,
            }),
            _ => None,
        })
        .collect()
}

/// Parameter list with the display-name rules of the playground: declared
/// name when present, else `<type>_<index>` when the entry has several
/// inputs, else the bare type; integer-family types accept `number | string`,
/// everything else `string`; array types append `[]`.
fn parameter_list(params: &[(&str, &str)]) -> String {
    let mut rendered = String::new();
    for (index, (name, ty)) in params.iter().enumerate() {
        if index > 0 {
            rendered.push_str(", ");
        }
        if !name.is_empty() {
            rendered.push_str(name);
        } else if params.len() > 1 {
            rendered.push_str(&format!("{ty}_{index}"));
        } else {
            rendered.push_str(ty);
        }
        if ty.contains("int") {
            rendered.push_str(": number | string");
        } else {
            rendered.push_str(": string");
        }
        if ty.contains("[]") {
            rendered.push_str("[]");
        }
    }
    rendered
}

fn signature_block(
    interface: &ContractInterface,
    indent: &str,
    mutating: &str,
    constant: &str,
) -> String {
    declared_entries(interface)
        .iter()
        .map(|entry| {
            format!(
                "{indent}{}: ({}) => {}",
                entry.name,
                parameter_list(&entry.params),
                if entry.constant { constant } else { mutating }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn web3_declaration(name: &str, interface: &ContractInterface) -> String {
    let methods = signature_block(interface, "    ", "any", "any");
    format!("declare var {name}: Contract & {{\n  methods: {{\n{methods}\n  }}\n}}\n")
}

fn ethers_declaration(name: &str, interface: &ContractInterface) -> String {
    let functions = signature_block(
        interface,
        "    ",
        "Promise<ContractTransaction>",
        "Promise<any>",
    );
    let estimate = signature_block(interface, "    ", "Promise<BigNumber>", "Promise<BigNumber>");
    let populate = signature_block(
        interface,
        "    ",
        "Promise<PopulatedTransaction>",
        "Promise<PopulatedTransaction>",
    );
    let filters = signature_block(
        interface,
        "    ",
        "(...args: Array<any>) => EventFilter",
        "(...args: Array<any>) => EventFilter",
    );
    let top_level = signature_block(
        interface,
        "  ",
        "Promise<ContractTransaction>",
        "Promise<any>",
    );
    format!(
        "declare var {name}: Contract & {{\n  readonly functions: {{\n{functions}\n  }}\n  readonly callStatic: {{\n{functions}\n  }}\n  readonly estimateGas: {{\n{estimate}\n  }}\n  readonly populateTransaction: {{\n{populate}\n  }}\n  readonly filters: {{\n{filters}\n  }}\n{top_level}\n}}\n"
    )
}
