//! Kernel configuration

/// Runtime configuration for a kernel instance.
///
/// Ring capacity and stack size are compile-time parameters of the kernel
/// type; this struct carries the values that only matter at launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsConfig {
    /// Kernel name, reported in log output.
    pub name: &'static str,
    /// Logical priority of the tick interrupt (0 is the most urgent).
    pub tick_priority: u8,
    /// Number of priority bits implemented by the interrupt controller.
    pub priority_bits: u8,
}

impl OsConfig {
    /// Defaults for a TM4C123-class part: 3 priority bits, tick at the
    /// least urgent level 7.
    pub const DEFAULT: OsConfig = OsConfig {
        name: "ringos",
        tick_priority: 7,
        priority_bits: 3,
    };

    /// Start building a configuration from the defaults
    pub const fn builder() -> OsConfigBuilder {
        OsConfigBuilder {
            config: Self::DEFAULT,
        }
    }

    /// Priority byte as written to the system handler priority register.
    ///
    /// The logical level occupies the implemented top bits; levels beyond
    /// the implemented range clamp to the least urgent one.
    pub const fn tick_priority_raw(&self) -> u8 {
        let bits = if self.priority_bits == 0 || self.priority_bits > 8 {
            8
        } else {
            self.priority_bits
        };
        let max_level = ((1u16 << bits) - 1) as u8;
        let level = if self.tick_priority > max_level {
            max_level
        } else {
            self.tick_priority
        };
        ((level as u16) << (8 - bits)) as u8
    }
}

impl Default for OsConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Builder for [`OsConfig`]
#[derive(Debug, Clone, Copy)]
pub struct OsConfigBuilder {
    config: OsConfig,
}

impl OsConfigBuilder {
    pub const fn name(mut self, name: &'static str) -> Self {
        self.config.name = name;
        self
    }

    pub const fn tick_priority(mut self, level: u8) -> Self {
        self.config.tick_priority = level;
        self
    }

    pub const fn priority_bits(mut self, bits: u8) -> Self {
        self.config.priority_bits = bits;
        self
    }

    pub const fn build(self) -> OsConfig {
        self.config
    }
}
