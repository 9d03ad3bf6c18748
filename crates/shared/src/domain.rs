use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(AgentId);
id_newtype!(KnowledgeBaseId);

/// Identifies one client session towards the agent service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Generation token of one analysis run. Strictly increasing per orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub u64);

impl RunId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// The four specialist analyses the coordinator fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialist {
    Liquidity,
    Operational,
    Sustainability,
    Audit,
}

impl Specialist {
    pub const ALL: [Specialist; 4] = [
        Specialist::Liquidity,
        Specialist::Operational,
        Specialist::Sustainability,
        Specialist::Audit,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Specialist::Liquidity => "liquidity",
            Specialist::Operational => "operational",
            Specialist::Sustainability => "sustainability",
            Specialist::Audit => "audit",
        }
    }

    pub fn panel_title(self) -> &'static str {
        match self {
            Specialist::Liquidity => "Liquidity Risk Analysis",
            Specialist::Operational => "Operational Efficiency Analysis",
            Specialist::Sustainability => "Sustainability Analysis",
            Specialist::Audit => "External Audit Review",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|specialist| specialist.key().eq_ignore_ascii_case(key.trim()))
    }
}

impl fmt::Display for Specialist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
