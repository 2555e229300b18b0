//! Decode-once contract interface model.
//!
//! The interface description is parsed a single time into tagged entries;
//! the binder and the declaration synthesizer only ever see the typed
//! entries, never raw JSON. Source order of entries is preserved.

use alloy_json_abi::{Constructor, Error as ErrorEntry, Event, Fallback, Function, Receive};

use crate::error::{BindError, BindResult};

/// One entry of an interface description, tagged by kind.
#[derive(Debug, Clone)]
pub enum InterfaceItem {
    Function(Function),
    Constructor(Constructor),
    Receive(Receive),
    Fallback(Fallback),
    Event(Event),
    Error(ErrorEntry),
}

impl InterfaceItem {
    /// Decode one raw entry, dispatching on its `type` field. Entries with
    /// no kind default to `function`, as the JSON ABI format specifies.
    fn decode(mut entry: serde_json::Value) -> BindResult<Self> {
        if entry.get("type").is_none() {
            if let Some(map) = entry.as_object_mut() {
                map.insert("type".to_string(), "function".into());
            }
        }
        let kind = entry
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or("function")
            .to_string();
        let decoded = match kind.as_str() {
            "function" => serde_json::from_value(entry).map(InterfaceItem::Function),
            "constructor" => serde_json::from_value(entry).map(InterfaceItem::Constructor),
            "receive" => serde_json::from_value(entry).map(InterfaceItem::Receive),
            "fallback" => serde_json::from_value(entry).map(InterfaceItem::Fallback),
            "event" => serde_json::from_value(entry).map(InterfaceItem::Event),
            "error" => serde_json::from_value(entry).map(InterfaceItem::Error),
            other => return Err(BindError::Parse(format!("unknown entry kind `{other}`"))),
        };
        decoded.map_err(|e| BindError::Parse(format!("{kind} entry: {e}")))
    }

    /// Entry name, for the kinds that carry one.
    pub fn name(&self) -> Option<&str> {
        match self {
            InterfaceItem::Function(f) => Some(&f.name),
            InterfaceItem::Event(e) => Some(&e.name),
            InterfaceItem::Error(e) => Some(&e.name),
            _ => None,
        }
    }
}

/// A parsed interface description, entries in source order.
#[derive(Debug, Clone)]
pub struct ContractInterface {
    items: Vec<InterfaceItem>,
}

impl ContractInterface {
    /// Parse interface description text. Failures are reported as a record
    /// error, never swallowed.
    pub fn parse(text: &str) -> BindResult<Self> {
        let raw: Vec<serde_json::Value> =
            serde_json::from_str(text).map_err(|e| BindError::Parse(e.to_string()))?;
        let items = raw
            .into_iter()
            .map(InterfaceItem::decode)
            .collect::<BindResult<Vec<_>>>()?;
        Ok(Self { items })
    }

    pub fn items(&self) -> &[InterfaceItem] {
        &self.items
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.items.iter().filter_map(|item| match item {
            InterfaceItem::Function(f) => Some(f),
            _ => None,
        })
    }

    /// First function with the given name (overloads resolve to the first
    /// declaration, matching the dynamic surface of the client libraries).
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions().find(|f| f.name == name)
    }

    pub fn event(&self, name: &str) -> Option<&Event> {
        self.items.iter().find_map(|item| match item {
            InterfaceItem::Event(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Clean up manually-pasted interface text: trims, strips whitespace outside
/// string literals, and quotes bare keys so JS-style object notation parses
/// as JSON.
pub fn sanitize_abi(raw: &str) -> String {
    let src: Vec<char> = raw.trim().chars().collect();
    let mut out = String::with_capacity(src.len());
    let mut in_string = false;
    let mut i = 0;

    while i < src.len() {
        let c = src[i];
        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < src.len() {
                out.push(src[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let start = i;
                while i < src.len() && (src[i].is_ascii_alphanumeric() || src[i] == '_') {
                    i += 1;
                }
                let mut j = i;
                while j < src.len() && src[j].is_whitespace() {
                    j += 1;
                }
                let word: String = src[start..i].iter().collect();
                if j < src.len() && src[j] == ':' {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(&word);
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub(crate) const ERC20_ABI: &str = r#"[
        {"type":"constructor","inputs":[{"name":"initialSupply","type":"uint256"}],"stateMutability":"nonpayable"},
        {"type":"function","name":"name","inputs":[],"outputs":[{"name":"","type":"string"}],"stateMutability":"view"},
        {"type":"function","name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"value","type":"uint256"}],"outputs":[{"name":"","type":"bool"}],"stateMutability":"nonpayable"},
        {"type":"event","name":"Transfer","inputs":[{"name":"from","type":"address","indexed":true},{"name":"to","type":"address","indexed":true},{"name":"value","type":"uint256","indexed":false}],"anonymous":false}
    ]"#;
}
