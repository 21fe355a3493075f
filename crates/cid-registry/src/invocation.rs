//! # Invocation Routing
//!
//! Transactions arrive as `{"function": "<Name>", "Args": [..]}`. This module
//! parses that envelope and maps it to a typed [`Function`], checking the
//! argument count against the exported signature.

use crate::errors::RegistryError;
use serde::{Deserialize, Serialize};

/// A raw chaincode invocation as submitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Exported function name, case-sensitive.
    pub function: String,
    /// Positional string arguments.
    #[serde(rename = "Args", default)]
    pub args: Vec<String>,
}

impl Invocation {
    /// Build an invocation in code.
    pub fn new<I, A>(function: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            function: function.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the JSON envelope.
    pub fn parse(json: &str) -> Result<Self, RegistryError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A chaincode function with its arguments bound.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Function {
    InitLedger,
    RegisterHash { hash: String, vector: String },
    ConfirmCidUpload { hash: String, cid: String },
    AuthenticateFace { vector: String },
    RequestDeleteCidRecord { hash: String },
    DeleteCidRecord { hash: String },
    ReadCidRecord { hash: String },
    GetAllCidRecords,
    CidRecordExists { hash: String },
}

impl Function {
    /// Every exported name with its arity.
    pub const SIGNATURES: [(&'static str, usize); 9] = [
        ("InitLedger", 0),
        ("RegisterHash", 2),
        ("ConfirmCIDUpload", 2),
        ("AuthenticateFace", 1),
        ("RequestDeleteCIDRecord", 1),
        ("DeleteCIDRecord", 1),
        ("ReadCIDRecord", 1),
        ("GetAllCIDRecords", 0),
        ("CIDRecordExists", 1),
    ];

    /// Exported name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitLedger => "InitLedger",
            Self::RegisterHash { .. } => "RegisterHash",
            Self::ConfirmCidUpload { .. } => "ConfirmCIDUpload",
            Self::AuthenticateFace { .. } => "AuthenticateFace",
            Self::RequestDeleteCidRecord { .. } => "RequestDeleteCIDRecord",
            Self::DeleteCidRecord { .. } => "DeleteCIDRecord",
            Self::ReadCidRecord { .. } => "ReadCIDRecord",
            Self::GetAllCidRecords => "GetAllCIDRecords",
            Self::CidRecordExists { .. } => "CIDRecordExists",
        }
    }

    /// Read-only functions are evaluated, never committed.
    #[must_use]
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Self::ReadCidRecord { .. } | Self::GetAllCidRecords | Self::CidRecordExists { .. }
        )
    }
}

impl TryFrom<Invocation> for Function {
    type Error = RegistryError;

    fn try_from(invocation: Invocation) -> Result<Self, Self::Error> {
        let (name, expected) = Self::SIGNATURES
            .iter()
            .copied()
            .find(|(name, _)| *name == invocation.function)
            .ok_or_else(|| RegistryError::UnknownFunction(invocation.function.clone()))?;

        if invocation.args.len() != expected {
            return Err(RegistryError::InvalidArity {
                function: name,
                expected,
                actual: invocation.args.len(),
            });
        }

        let mut args = invocation.args.into_iter();
        // Arity is checked above, so every positional read is present.
        let mut next = || args.next().unwrap_or_default();

        Ok(match name {
            "InitLedger" => Self::InitLedger,
            "RegisterHash" => Self::RegisterHash {
                hash: next(),
                vector: next(),
            },
            "ConfirmCIDUpload" => Self::ConfirmCidUpload {
                hash: next(),
                cid: next(),
            },
            "AuthenticateFace" => Self::AuthenticateFace { vector: next() },
            "RequestDeleteCIDRecord" => Self::RequestDeleteCidRecord { hash: next() },
            "DeleteCIDRecord" => Self::DeleteCidRecord { hash: next() },
            "ReadCIDRecord" => Self::ReadCidRecord { hash: next() },
            "GetAllCIDRecords" => Self::GetAllCidRecords,
            "CIDRecordExists" => Self::CidRecordExists { hash: next() },
            other => return Err(RegistryError::UnknownFunction(other.to_string())),
        })
    }
}
