//! `logctl level` — show how a level name resolves.

use anyhow::Result;
use clap::Args;

use loggerd_core::{parse_level, Severity};

#[derive(Args, Debug)]
pub struct LevelArgs {
    /// Level name, alias or number.
    pub text: String,

    /// Reject unknown names instead of treating them as emergency.
    #[arg(long)]
    pub strict: bool,
}

impl LevelArgs {
    pub fn run(self) -> Result<()> {
        let level = if self.strict {
            self.text.parse::<Severity>()?
        } else {
            parse_level(Some(&self.text))
        };
        println!("{} {}", level.as_u32(), level);
        Ok(())
    }
}
