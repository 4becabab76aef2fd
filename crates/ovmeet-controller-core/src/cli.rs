// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[clap(name = "ovmeet-controller")]
pub struct Args {
    #[clap(
        short,
        long,
        default_value = "config.toml",
        help = "Specify path to configuration file"
    )]
    pub config: String,

    #[clap(short('V'), long, action = ArgAction::SetTrue, help = "Print version information")]
    pub version: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
