//! Live callable bindings over a parsed contract interface.
//!
//! Two flavors are supported, mirroring the two client libraries the
//! playground scripts target: the `web3` style groups callables under a
//! single `methods` namespace with loosely-typed arguments, the `ethers`
//! style replicates each fragment across the richer
//! functions/callStatic/estimateGas/populateTransaction/filters surface.

use std::sync::Arc;

use alloy_dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy_json_abi::{Function, StateMutability};
use alloy_primitives::{Address, hex};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{BindError, BindResult};
use crate::explorer::ChainApi;
use crate::interface::ContractInterface;

/// Client-binding style selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryFlavor {
    Web3,
    Ethers,
}

impl LibraryFlavor {
    pub fn as_str(self) -> &'static str {
        match self {
            LibraryFlavor::Web3 => "web3",
            LibraryFlavor::Ethers => "ethers",
        }
    }
}

impl std::str::FromStr for LibraryFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web3" => Ok(LibraryFlavor::Web3),
            "ethers" => Ok(LibraryFlavor::Ethers),
            other => Err(format!("unknown library flavor: {other}")),
        }
    }
}

pub const WEB3_NAMESPACES: &[&str] = &["methods"];
pub const ETHERS_NAMESPACES: &[&str] = &[
    "functions",
    "callStatic",
    "estimateGas",
    "populateTransaction",
    "filters",
];

/// A live callable contract: the capability surface the scope manager and
/// declaration synthesizer depend on.
#[async_trait]
pub trait ContractBinding: Send + Sync {
    fn flavor(&self) -> LibraryFlavor;

    /// The call target. For proxied contracts this is the proxy address,
    /// while the interface comes from the implementation.
    fn address(&self) -> Address;

    fn interface(&self) -> &ContractInterface;

    /// Namespaces the flavor exposes on its invocation surface.
    fn namespaces(&self) -> &'static [&'static str];

    /// Encode calldata for `method` with loosely-typed arguments.
    fn encode_call(&self, method: &str, args: &[Value]) -> BindResult<String>;

    /// Read-only invocation through the indexing API.
    async fn call(&self, method: &str, args: &[Value]) -> BindResult<Value>;

    /// Populate an unsigned transaction for a mutating method; signing and
    /// submission belong to the wallet, not to this crate.
    fn populate(&self, method: &str, args: &[Value]) -> BindResult<Value>;
}

/// Construct the callable wrapper for `interface` at `address`. Every
/// failure (malformed entries, unsupported parameter types) is caught and
/// reported, never panicked on.
pub fn bind(
    interface: Arc<ContractInterface>,
    address: Address,
    flavor: LibraryFlavor,
    api: Arc<dyn ChainApi>,
) -> BindResult<Arc<dyn ContractBinding>> {
    let core = BindingCore::new(interface, address, api)?;
    Ok(match flavor {
        LibraryFlavor::Web3 => Arc::new(Web3Binding { core }),
        LibraryFlavor::Ethers => Arc::new(EthersBinding { core }),
    })
}

/// A function entry with its parameter types resolved up front, so argument
/// coercion failures surface at bind time rather than mid-script.
struct PreparedFunction {
    function: Function,
    inputs: Vec<DynSolType>,
}

struct BindingCore {
    interface: Arc<ContractInterface>,
    address: Address,
    api: Arc<dyn ChainApi>,
    prepared: Vec<PreparedFunction>,
}

impl BindingCore {
    fn new(
        interface: Arc<ContractInterface>,
        address: Address,
        api: Arc<dyn ChainApi>,
    ) -> BindResult<Self> {
        let mut prepared = Vec::new();
        for function in interface.functions() {
            let inputs = function
                .inputs
                .iter()
                .map(|param| {
                    param.resolve().map_err(|e| {
                        BindError::Construction(format!(
                            "{}: unsupported parameter type `{}`: {e}",
                            function.name, param.ty
                        ))
                    })
                })
                .collect::<BindResult<Vec<_>>>()?;
            // Outputs are resolved too: a malformed return type must fail
            // the bind, not the first call.
            for param in &function.outputs {
                param.resolve().map_err(|e| {
                    BindError::Construction(format!(
                        "{}: unsupported return type `{}`: {e}",
                        function.name, param.ty
                    ))
                })?;
            }
            prepared.push(PreparedFunction {
                function: function.clone(),
                inputs,
            });
        }
        Ok(Self {
            interface,
            address,
            api,
            prepared,
        })
    }

    fn lookup(&self, method: &str) -> BindResult<&PreparedFunction> {
        self.prepared
            .iter()
            .find(|p| p.function.name == method)
            .ok_or_else(|| BindError::Construction(format!("no method named `{method}`")))
    }

    fn encode(&self, method: &str, args: &[Value]) -> BindResult<String> {
        let prepared = self.lookup(method)?;
        if args.len() != prepared.inputs.len() {
            return Err(BindError::Construction(format!(
                "`{method}` expects {} argument(s), got {}",
                prepared.inputs.len(),
                args.len()
            )));
        }
        let values = prepared
            .inputs
            .iter()
            .zip(args)
            .map(|(ty, arg)| coerce(ty, arg))
            .collect::<BindResult<Vec<_>>>()?;
        let calldata = prepared
            .function
            .abi_encode_input(&values)
            .map_err(|e| BindError::Construction(format!("failed to encode `{method}`: {e}")))?;
        Ok(hex::encode_prefixed(calldata))
    }

    async fn call(&self, method: &str, args: &[Value]) -> BindResult<Value> {
        let data = self.encode(method, args)?;
        let raw = self.api.eth_call(self.address, &data).await?;
        let bytes = hex::decode(raw.trim_start_matches("0x"))
            .map_err(|e| BindError::Network(format!("malformed call result: {e}")))?;
        let prepared = self.lookup(method)?;
        let outputs = prepared
            .function
            .abi_decode_output(&bytes)
            .map_err(|e| BindError::Parse(format!("failed to decode `{method}` result: {e}")))?;
        Ok(render_outputs(outputs))
    }

    fn populate(&self, method: &str, args: &[Value]) -> BindResult<Value> {
        let data = self.encode(method, args)?;
        Ok(json!({
            "to": self.address.to_string(),
            "data": data,
            "value": "0",
        }))
    }
}

/// Coerce a loosely-typed script argument into the declared parameter type.
fn coerce(ty: &DynSolType, value: &Value) -> BindResult<DynSolValue> {
    match value {
        Value::Array(items) => match ty {
            DynSolType::Array(inner) => items
                .iter()
                .map(|item| coerce(inner, item))
                .collect::<BindResult<Vec<_>>>()
                .map(DynSolValue::Array),
            DynSolType::FixedArray(inner, size) => {
                if items.len() != *size {
                    return Err(BindError::Construction(format!(
                        "expected {size} elements for {ty}, got {}",
                        items.len()
                    )));
                }
                items
                    .iter()
                    .map(|item| coerce(inner, item))
                    .collect::<BindResult<Vec<_>>>()
                    .map(DynSolValue::FixedArray)
            }
            DynSolType::Tuple(inner) => {
                if items.len() != inner.len() {
                    return Err(BindError::Construction(format!(
                        "expected {} components for {ty}, got {}",
                        inner.len(),
                        items.len()
                    )));
                }
                inner
                    .iter()
                    .zip(items)
                    .map(|(ty, item)| coerce(ty, item))
                    .collect::<BindResult<Vec<_>>>()
                    .map(DynSolValue::Tuple)
            }
            _ => Err(BindError::Construction(format!(
                "cannot pass an array as {ty}"
            ))),
        },
        Value::String(s) => coerce_text(ty, s),
        Value::Number(n) => coerce_text(ty, &n.to_string()),
        Value::Bool(b) => coerce_text(ty, if *b { "true" } else { "false" }),
        other => Err(BindError::Construction(format!(
            "unsupported argument {other} for {ty}"
        ))),
    }
}

fn coerce_text(ty: &DynSolType, text: &str) -> BindResult<DynSolValue> {
    ty.coerce_str(text)
        .map_err(|e| BindError::Construction(format!("invalid argument for {ty}: {e}")))
}

fn render_outputs(mut outputs: Vec<DynSolValue>) -> Value {
    match outputs.len() {
        0 => Value::Null,
        1 => render_value(outputs.remove(0)),
        _ => Value::Array(outputs.into_iter().map(render_value).collect()),
    }
}

fn render_value(value: DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::Address(a) => Value::String(a.to_string()),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(hex::encode_prefixed(&word.as_slice()[..size]))
        }
        DynSolValue::Bytes(bytes) => Value::String(hex::encode_prefixed(bytes)),
        DynSolValue::String(s) => Value::String(s),
        DynSolValue::Array(items)
        | DynSolValue::FixedArray(items)
        | DynSolValue::Tuple(items) => {
            Value::Array(items.into_iter().map(render_value).collect())
        }
        other => Value::String(format!("{other:?}")),
    }
}

pub struct Web3Binding {
    core: BindingCore,
}

#[async_trait]
impl ContractBinding for Web3Binding {
    fn flavor(&self) -> LibraryFlavor {
        LibraryFlavor::Web3
    }

    fn address(&self) -> Address {
        self.core.address
    }

    fn interface(&self) -> &ContractInterface {
        &self.core.interface
    }

    fn namespaces(&self) -> &'static [&'static str] {
        WEB3_NAMESPACES
    }

    fn encode_call(&self, method: &str, args: &[Value]) -> BindResult<String> {
        self.core.encode(method, args)
    }

    async fn call(&self, method: &str, args: &[Value]) -> BindResult<Value> {
        self.core.call(method, args).await
    }

    fn populate(&self, method: &str, args: &[Value]) -> BindResult<Value> {
        self.core.populate(method, args)
    }
}

pub struct EthersBinding {
    core: BindingCore,
}

impl EthersBinding {
    /// Topic0 for the event filter builder surface.
    pub fn filter_topic(&self, event: &str) -> BindResult<String> {
        self.core
            .interface
            .event(event)
            .map(|e| e.selector().to_string())
            .ok_or_else(|| BindError::Construction(format!("no event named `{event}`")))
    }
}

#[async_trait]
impl ContractBinding for EthersBinding {
    fn flavor(&self) -> LibraryFlavor {
        LibraryFlavor::Ethers
    }

    fn address(&self) -> Address {
        self.core.address
    }

    fn interface(&self) -> &ContractInterface {
        &self.core.interface
    }

    fn namespaces(&self) -> &'static [&'static str] {
        ETHERS_NAMESPACES
    }

    fn encode_call(&self, method: &str, args: &[Value]) -> BindResult<String> {
        self.core.encode(method, args)
    }

    async fn call(&self, method: &str, args: &[Value]) -> BindResult<Value> {
        // callStatic semantics: any method is callable read-only.
        self.core.call(method, args).await
    }

    fn populate(&self, method: &str, args: &[Value]) -> BindResult<Value> {
        let prepared = self.core.lookup(method)?;
        if matches!(
            prepared.function.state_mutability,
            StateMutability::Pure | StateMutability::View
        ) {
            return Err(BindError::Construction(format!(
                "`{method}` is read-only and has no transaction to populate"
            )));
        }
        self.core.populate(method, args)
    }
}
