//! Call descriptors: what a transaction does
//!
//! A descriptor names a pallet and call and carries the ordered argument values. Names are
//! matched against the metadata case- and underscore-insensitively; the builder stores the
//! canonical spelling.

use crate::codec::Value;
use serde::{Serialize, Serializer};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDescriptor {
    pub pallet: String,
    pub call: String,
    /// Argument values in metadata declaration order
    pub args: Vec<Value>,
}

impl CallDescriptor {
    pub fn new(pallet: impl Into<String>, call: impl Into<String>, args: Vec<Value>) -> Self {
        CallDescriptor {
            pallet: pallet.into(),
            call: call.into(),
            args,
        }
    }

    /// `Pallet.call`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.pallet, self.call)
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "pallet": self.pallet,
            "call": self.call,
            "args": self.args.iter().map(Value::to_json).collect::<Vec<_>>(),
        })
    }
}

impl Serialize for CallDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
