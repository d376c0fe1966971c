//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = super::active_config_path(global);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
        ConfigCommand::Show => {
            let shown = super::load(global)?.redacted();
            let toml = shown.to_redacted_toml()?;
            let out = output::render(global.output, &shown, |_| toml.clone(), |_| toml.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
