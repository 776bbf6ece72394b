//! Node configuration: baud rate, role, autobaud and the list of PIDs with
//! a dedicated checksum seeding. Set once before initialisation and read
//! by the engine afterwards.
use crate::core::NodeRole;
use crate::error::ConfigError;

/// Capacity of the classic PID list.
pub const MAX_CLASSIC_PIDS: usize = 16;

/// List entry meaning "applies to every PID".
pub const ALL_PIDS_SENTINEL: u8 = 0xFF;

/// Highest baud rate allowed on a LIN bus.
pub const MAX_BAUD_RATE: u32 = 20_000;

/// Baud rate used before configuration overrides it, and by autobaud slaves
/// until they lock.
pub const DEFAULT_BAUD_RATE: u32 = 19_200;

//==================================================================================PID_LIST
/// Fixed-capacity list of protected identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidList {
    len: usize,
    data: [u8; MAX_CLASSIC_PIDS],
}

impl Default for PidList {
    fn default() -> Self {
        Self::new()
    }
}

impl PidList {
    /// Create an empty list.
    pub const fn new() -> Self {
        Self {
            len: 0,
            data: [0; MAX_CLASSIC_PIDS],
        }
    }

    /// Append a PID. Duplicates are ignored.
    pub fn push(&mut self, pid: u8) -> Result<(), ConfigError> {
        if self.contains(pid) {
            return Ok(());
        }
        if self.len == MAX_CLASSIC_PIDS {
            return Err(ConfigError::TooManyClassicPids {
                capacity: MAX_CLASSIC_PIDS,
            });
        }
        self.data[self.len] = pid;
        self.len += 1;
        Ok(())
    }

    #[inline]
    pub fn contains(&self, pid: u8) -> bool {
        self.as_slice().contains(&pid)
    }

    /// True when the sentinel entry is present.
    #[inline]
    pub fn covers_all(&self) -> bool {
        self.contains(ALL_PIDS_SENTINEL)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Immutable view over the populated entries.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

//==================================================================================LIN_USER_CONFIG
/// Configuration of a LIN node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinUserConfig {
    /// Bus speed in bit/s. Ignored by autobaud slaves until they lock.
    pub baud_rate: u32,
    pub role: NodeRole,
    /// Discover the bus speed from the sync field (slave only).
    pub autobaud: bool,
    /// PIDs seeding the checksum with their own value.
    pub classic_pids: PidList,
}

impl LinUserConfig {
    /// Start a configuration for the given role.
    pub fn builder(role: NodeRole) -> LinConfigBuilder {
        LinConfigBuilder::new(role)
    }

    /// True for a slave that still has to discover the bus speed.
    #[inline]
    pub fn uses_autobaud(&self) -> bool {
        self.autobaud && self.role == NodeRole::Slave
    }
}

//==================================================================================LIN_CONFIG_BUILDER
#[derive(Debug)]
/// Fluent builder validating the configuration on `build`.
pub struct LinConfigBuilder {
    baud_rate: u32,
    role: NodeRole,
    autobaud: bool,
    classic_pids: PidList,
    overflow: bool,
}

impl LinConfigBuilder {
    /// Initialise the builder with 19200 bit/s, no autobaud and an empty PID list.
    pub fn new(role: NodeRole) -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            role,
            autobaud: false,
            classic_pids: PidList::new(),
            overflow: false,
        }
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn autobaud(mut self, enabled: bool) -> Self {
        self.autobaud = enabled;
        self
    }

    /// Add one PID to the classic list.
    pub fn classic_pid(mut self, pid: u8) -> Self {
        if self.classic_pids.push(pid).is_err() {
            self.overflow = true;
        }
        self
    }

    /// Add several PIDs to the classic list.
    pub fn classic_pids(self, pids: &[u8]) -> Self {
        pids.iter().fold(self, |builder, &pid| builder.classic_pid(pid))
    }

    /// Push the sentinel: every PID is treated as listed.
    pub fn all_pids_classic(self) -> Self {
        self.classic_pid(ALL_PIDS_SENTINEL)
    }

    /// Validate and produce the configuration.
    ///
    /// Rules:
    /// - baud rate must lie in `1..=20000`
    /// - autobaud is refused on a master
    /// - the PID list must fit in [`MAX_CLASSIC_PIDS`] entries
    pub fn build(self) -> Result<LinUserConfig, ConfigError> {
        if self.baud_rate == 0 || self.baud_rate > MAX_BAUD_RATE {
            return Err(ConfigError::InvalidBaudRate {
                baud_rate: self.baud_rate,
            });
        }
        if self.autobaud && self.role == NodeRole::Master {
            return Err(ConfigError::AutobaudOnMaster);
        }
        if self.overflow {
            return Err(ConfigError::TooManyClassicPids {
                capacity: MAX_CLASSIC_PIDS,
            });
        }

        Ok(LinUserConfig {
            baud_rate: self.baud_rate,
            role: self.role,
            autobaud: self.autobaud,
            classic_pids: self.classic_pids,
        })
    }
}
