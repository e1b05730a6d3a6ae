mod cmd;
mod util;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use figment::providers::{Data, Env, Format as _, Json, Toml, Yaml};
use figment::Figment;
use prudbg::CoreLayout;
use serde::{Deserialize, Serialize};

use crate::util::logging::{setup_logging, LevelFilter};

/// Word layouts of PRU0 and PRU1 on the AM335x.
const AM335X_CORES: [CoreLayout; 2] = [
    CoreLayout {
        instruction: 0xd000,
        data: 0x0000,
        control: 0x8800,
    },
    CoreLayout {
        instruction: 0xe000,
        data: 0x0800,
        control: 0x9000,
    },
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// File the PRU subsystem is mapped from.
    pub window: PathBuf,
    /// Byte offset of the PRU subsystem in `window`.
    pub window_offset: u64,
    /// Size of the PRU subsystem in bytes.
    pub window_len: u64,
    pub cores: Vec<CoreLayout>,
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: PathBuf::from("/dev/mem"),
            window_offset: 0x4a30_0000,
            window_len: 0x4_0000,
            cores: AM335X_CORES.to_vec(),
            poll_interval_ms: 50,
        }
    }
}

#[derive(clap::Parser)]
#[clap(name = "prudbg", about = "A debugger for PRU cores", version)]
struct Cli {
    /// Location for log file
    #[clap(long, global = true, help_heading = "LOG CONFIGURATION")]
    log_file: Option<PathBuf>,
    /// Log level, overrides RUST_LOG
    #[clap(long, global = true, value_enum, help_heading = "LOG CONFIGURATION")]
    log_level: Option<LevelFilter>,

    #[clap(subcommand)]
    subcommand: Subcommand,
}

impl Cli {
    fn run(self, config: Config) -> Result<()> {
        match self.subcommand {
            Subcommand::Decode(cmd) => cmd.run(),
            Subcommand::Disasm(cmd) => cmd.run(),
            Subcommand::Status(cmd) => cmd.run(&config),
            Subcommand::Regs(cmd) => cmd.run(&config),
            Subcommand::SetReg(cmd) => cmd.run(&config),
            Subcommand::Dis(cmd) => cmd.run(&config),
            Subcommand::Dump(cmd) => cmd.run(&config),
            Subcommand::Halt(cmd) => cmd.run(&config),
            Subcommand::Resume(cmd) => cmd.run(&config),
            Subcommand::Step(cmd) => cmd.run(&config),
            Subcommand::Run(cmd) => cmd.run(&config),
            Subcommand::Reset(cmd) => cmd.run(&config),
            Subcommand::Jump(cmd) => cmd.run(&config),
            Subcommand::Counter(cmd) => cmd.run(&config),
            Subcommand::Load(cmd) => cmd.run(&config),
            Subcommand::Trace(cmd) => cmd.run(&config),
        }
    }
}

#[derive(clap::Subcommand)]
enum Subcommand {
    /// Decode instruction words
    Decode(cmd::decode::Cmd),
    /// Disassemble a program image
    Disasm(cmd::disasm::Cmd),
    /// Show the control state of a core
    Status(cmd::status::Cmd),
    /// Show the registers or the constants table of a core
    Regs(cmd::regs::Cmd),
    /// Write a register of a halted core
    SetReg(cmd::regs::SetCmd),
    /// Disassemble the instruction memory of a core
    Dis(cmd::dis::Cmd),
    /// Dump the data memory of a core
    Dump(cmd::dump::Cmd),
    /// Halt a core
    Halt(cmd::halt::Cmd),
    /// Let a core run freely, without breakpoints
    Resume(cmd::halt::ResumeCmd),
    /// Execute single instructions
    Step(cmd::step::Cmd),
    /// Run a core until a breakpoint, a watchpoint or a HALT instruction
    Run(cmd::run::Cmd),
    /// Reset a core
    Reset(cmd::reset::Cmd),
    /// Restart a core at another address
    Jump(cmd::jump::Cmd),
    /// Control the cycle and stall counters
    Counter(cmd::counter::Cmd),
    /// Load a program image into instruction memory
    Load(cmd::load::Cmd),
    /// Record the program counter of a running core
    Trace(cmd::trace::Cmd),
}

fn main() -> Result<()> {
    let matches = Cli::parse();

    let log_path = matches.log_file.clone();
    let _logger_guard = setup_logging(log_path.as_deref(), matches.log_level)?;

    let config = load_config().context("Failed to load configuration.")?;

    matches.run(config)
}

/// The built-in defaults overlaid by the configuration files in `paths`.
fn config_files(paths: &[PathBuf]) -> Result<Figment> {
    // Files to search for, without extension.
    let files = [".prudbg"];

    let default_config = serde_json::to_string_pretty(&Config::default())?;
    let mut figment = Figment::from(Data::<Json>::string(&default_config));
    for path in paths {
        for file in files {
            figment = figment
                .merge(Toml::file(path.join(format!("{file}.toml"))))
                .merge(Json::file(path.join(format!("{file}.json"))))
                .merge(Yaml::file(path.join(format!("{file}.yaml"))))
                .merge(Yaml::file(path.join(format!("{file}.yml"))));
        }
    }

    Ok(figment)
}

fn load_config() -> Result<Config> {
    // Paths to search for the configuration file.
    let mut paths = vec![PathBuf::from(".")];
    if let Some(home) = directories::UserDirs::new().map(|user| user.home_dir().to_path_buf()) {
        paths.push(home);
    }

    let config = config_files(&paths)?
        .merge(Env::prefixed("PRUDBG_").only(&[
            "window",
            "window_offset",
            "window_len",
            "poll_interval_ms",
        ]))
        .extract::<Config>()?;

    tracing::debug!("Configuration: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_pass_through_the_layers() {
        let config: Config = config_files(&[]).unwrap().extract().unwrap();

        assert_eq!(config.window, PathBuf::from("/dev/mem"));
        assert_eq!(config.window_offset, 0x4a30_0000);
        assert_eq!(config.cores, AM335X_CORES.to_vec());
    }

    #[test]
    fn files_override_the_defaults() {
        let toml = r#"
            window = "pruss.bin"
            window_offset = 0

            [[cores]]
            instruction = 0x3000
            data = 0x0800
            control = 0x1e00
        "#;

        let config: Config = config_files(&[])
            .unwrap()
            .merge(Data::<Toml>::string(toml))
            .extract()
            .unwrap();

        assert_eq!(config.window, PathBuf::from("pruss.bin"));
        assert_eq!(config.window_offset, 0);
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(
            config.cores,
            vec![CoreLayout {
                instruction: 0x3000,
                data: 0x0800,
                control: 0x1e00,
            }]
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = config_files(&[])
            .unwrap()
            .merge(Data::<Toml>::string("windw = \"typo\""))
            .extract::<Config>();

        assert!(result.is_err());
    }
}
