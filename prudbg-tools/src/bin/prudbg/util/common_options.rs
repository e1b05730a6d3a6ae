use std::path::PathBuf;

use anyhow::Context;
use prudbg::{CoreLayout, EngineConfig, MappedCore};

use crate::util::window::FileWindow;
use crate::util::parse_u64;
use crate::Config;

/// Common options to select the memory window and the core to debug.
#[derive(clap::Parser, Debug, Default)]
pub struct CoreOptions {
    /// Index of the PRU core.
    #[clap(long, short, default_value = "0", help_heading = "CORE CONFIGURATION")]
    pub core: usize,

    /// The file the PRU subsystem is mapped from, e.g. /dev/mem or a memory image.
    #[clap(long, help_heading = "CORE CONFIGURATION")]
    pub window: Option<PathBuf>,

    /// Byte offset of the PRU subsystem inside the window file.
    #[clap(long, value_parser = parse_u64, help_heading = "CORE CONFIGURATION")]
    pub window_offset: Option<u64>,
}

impl CoreOptions {
    /// The layout of the selected core.
    pub fn layout(&self, config: &Config) -> anyhow::Result<CoreLayout> {
        config.cores.get(self.core).copied().with_context(|| {
            format!(
                "PRU{} does not exist, {} cores are configured",
                self.core,
                config.cores.len()
            )
        })
    }

    /// Open the window and map the selected core.
    pub fn open(&self, config: &Config) -> anyhow::Result<MappedCore<FileWindow>> {
        let layout = self.layout(config)?;
        let path = self.window.as_ref().unwrap_or(&config.window);
        let offset = self.window_offset.unwrap_or(config.window_offset);

        let window = FileWindow::open(path, offset, config.window_len)?;
        tracing::debug!("PRU{} mapped from {:?} at {:#x}", self.core, path, offset);

        Ok(MappedCore::new(window, layout))
    }

    pub fn engine_config(&self, config: &Config) -> EngineConfig {
        EngineConfig::default()
            .with_poll_interval(std::time::Duration::from_millis(config.poll_interval_ms))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unknown_core_is_rejected() {
        let options = CoreOptions {
            core: 2,
            ..Default::default()
        };

        let error = options.layout(&Config::default()).unwrap_err();

        assert_eq!(
            error.to_string(),
            "PRU2 does not exist, 2 cores are configured"
        );
    }

    #[test]
    fn second_core_uses_its_own_layout() {
        let options = CoreOptions {
            core: 1,
            ..Default::default()
        };

        let layout = options.layout(&Config::default()).unwrap();

        assert_eq!(layout.instruction, 0xe000);
        assert_eq!(layout.data, 0x0800);
        assert_eq!(layout.control, 0x9000);
    }
}
