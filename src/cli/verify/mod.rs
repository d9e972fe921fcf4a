// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to verify mnemonic files.


use std::path::{Path, PathBuf};

use clap::Parser;
use log::info;

use super::common::InfoPrinter;
use crate::{
    params::{MnemonicFile, PlotData},
    TrendingError,
};

/// Verify that mnemonic files can be read and are valid.
#[derive(Parser, Debug)]
pub(super) struct VerifyArgs {
    /// Path to the mnemonic file(s) to be verified.
    #[clap(name = "MNEMONIC_FILES", required = true, parse(from_os_str))]
    pub(super) files: Vec<PathBuf>,
}

impl VerifyArgs {
    /// Summarise every file that can be read. Every file is tried, even if an
    /// earlier one is invalid; the number of invalid files is then an error.
    pub(super) fn run(&self) -> Result<(), TrendingError> {
        let num_bad = self.files.iter().filter(|f| !verify(f)).count();
        if num_bad > 0 {
            return Err(TrendingError::Mnemonics(format!(
                "{num_bad} of {} mnemonic files are invalid",
                self.files.len()
            )));
        }
        Ok(())
    }
}

/// Read and summarise a mnemonic file. Problems are logged rather than
/// returned.
fn verify(file: &Path) -> bool {
    let mnemonics = match MnemonicFile::read(file) {
        Ok(m) => m,
        Err(e) => {
            info!("{}:", file.display());
            info!("    {e}");
            info!("");
            return false;
        }
    };

    let mut printer = InfoPrinter::new(format!("{}", file.display()).into());
    printer.push_line(format!("{} mnemonics", mnemonics.len()).into());
    for (kind, configs) in mnemonics.groups() {
        let num_products = configs
            .iter()
            .filter(|c| matches!(c.plot_data(), Ok(PlotData::Product(_))))
            .count();
        let num_conditional = configs.iter().filter(|c| !c.dependency.is_empty()).count();
        let mut block = vec![format!(
            "{kind}: {} mnemonics ({num_conditional} with dependencies, {num_products} products)",
            configs.len()
        )
        .into()];
        for config in configs {
            let deps = config
                .dependency
                .iter()
                .map(|d| format!("{} {} {}", d.name, d.relation, d.threshold))
                .collect::<Vec<_>>();
            let line = if deps.is_empty() {
                format!("  {}", config.name)
            } else {
                format!("  {} when {}", config.name, deps.join(" and "))
            };
            block.push(line.into());
        }
        printer.push_block(block);
    }
    printer.display();
    true
}
