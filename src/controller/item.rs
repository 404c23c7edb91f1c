use std::fmt;

/// Closed tag for the watched resource kinds.
///
/// Adding a kind means extending this enum and its name table; nothing in
/// the queue or dispatch machinery switches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    External,
    Custom,
}

impl MetricKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            MetricKind::External => "ExternalMetric",
            MetricKind::Custom => "CustomMetric",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ExternalMetric" => Some(MetricKind::External),
            "CustomMetric" => Some(MetricKind::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The deduplication identity flowing through the queue: a
/// `"<namespace>/<name>"` key tagged with its resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    kind: MetricKind,
    namespace_key: String,
}

impl WorkItem {
    pub fn new(kind: MetricKind, namespace_key: impl Into<String>) -> Self {
        Self {
            kind,
            namespace_key: namespace_key.into(),
        }
    }

    pub fn from_parts(kind: MetricKind, namespace: &str, name: &str) -> Self {
        Self {
            kind,
            namespace_key: format!("{namespace}/{name}"),
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn namespace_key(&self) -> &str {
        &self.namespace_key
    }

    /// Namespace portion of the key; empty for a key without a namespace.
    pub fn namespace(&self) -> &str {
        self.namespace_key
            .split_once('/')
            .map(|(namespace, _)| namespace)
            .unwrap_or("")
    }

    /// Name portion of the key.
    pub fn name(&self) -> &str {
        self.namespace_key
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.namespace_key)
    }

    /// Canonical queue encoding: `<KindName>/<namespace>/<name>`.
    pub fn queue_key(&self) -> String {
        format!("{}/{}", self.kind.as_str(), self.namespace_key)
    }

    /// Parses a queue entry back into a `WorkItem`.
    ///
    /// Anything a producer pushed past the enqueue adapter can land here, so
    /// the shape is fully validated: a known kind name, then a non-empty
    /// `namespace/name` key (a bare name is accepted for resources without a
    /// namespace).
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let Some((kind_name, key)) = raw.split_once('/') else {
            return Err(DecodeError::MalformedKey {
                raw: raw.to_string(),
            });
        };
        let Some(kind) = MetricKind::from_name(kind_name) else {
            return Err(DecodeError::UnknownKind {
                raw: raw.to_string(),
            });
        };
        let segments: Vec<&str> = key.split('/').collect();
        if segments.len() > 2 || segments.iter().any(|segment| segment.is_empty()) {
            return Err(DecodeError::MalformedKey {
                raw: raw.to_string(),
            });
        }
        Ok(Self::new(kind, key))
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.namespace_key)
    }
}

/// A queue entry that does not name a well-formed work item.
#[derive(Debug)]
pub enum DecodeError {
    UnknownKind { raw: String },
    MalformedKey { raw: String },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnknownKind { raw } => {
                write!(f, "queue entry {raw:?} does not name a known metric kind")
            }
            DecodeError::MalformedKey { raw } => {
                write!(
                    f,
                    "queue entry {raw:?} is not a well-formed <kind>/<namespace>/<name> key"
                )
            }
        }
    }
}

impl std::error::Error for DecodeError {}
