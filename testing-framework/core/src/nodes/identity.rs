use std::path::PathBuf;

/// Static identity of one network participant, fixed at setup time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeIdentity {
    pub name: String,
    pub chain_id: String,
    pub config_dir: PathBuf,
    pub public_key: Vec<u8>,
    pub is_validator: bool,
    pub snapshot_interval: u64,
}

impl NodeIdentity {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        chain_id: impl Into<String>,
        config_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            chain_id: chain_id.into(),
            config_dir: config_dir.into(),
            public_key: Vec::new(),
            is_validator: false,
            snapshot_interval: 0,
        }
    }

    /// Marks the node as a validator whose operator address is derived from
    /// `public_key` once it is live.
    #[must_use]
    pub fn validator(mut self, public_key: impl Into<Vec<u8>>) -> Self {
        self.public_key = public_key.into();
        self.is_validator = true;
        self
    }

    #[must_use]
    pub const fn with_snapshot_interval(mut self, interval: u64) -> Self {
        self.snapshot_interval = interval;
        self
    }
}
