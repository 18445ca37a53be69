//! `package` and `install`.

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use tpkit_cargo::Toolchain;
use tpkit_config::InstallLayout;
use tpkit_package::pipeline::{install_component, package_component};
use tpkit_package::{PackageOutcome, PackageReport};

use crate::errors::AppError;

pub(super) fn package<T, W>(
    toolchain: &T,
    root: &Path,
    force: bool,
    out: &mut W,
) -> Result<ExitCode, AppError>
where
    T: Toolchain,
    W: Write,
{
    let report = package_component(toolchain, root, force)?;
    describe_package(&report, out)?;
    Ok(ExitCode::SUCCESS)
}

pub(super) fn install<T, W>(
    toolchain: &T,
    root: &Path,
    plugins_dir: Option<&Path>,
    out: &mut W,
) -> Result<ExitCode, AppError>
where
    T: Toolchain,
    W: Write,
{
    let layout = plugins_dir.map_or_else(InstallLayout::for_user, |dir| {
        Ok(InstallLayout::with_plugins_root(dir))
    })?;
    let summary = install_component(toolchain, root, &layout, false)?;
    describe_package(&summary.package, out)?;
    writeln!(
        out,
        "Installed {} into {} ({} files)",
        summary.package.config.display_name(),
        summary.install.destination.display(),
        summary.install.files
    )?;
    Ok(ExitCode::SUCCESS)
}

fn describe_package<W: Write>(report: &PackageReport, out: &mut W) -> io::Result<()> {
    let name = report.config.display_name();
    match &report.outcome {
        PackageOutcome::UpToDate { archive } => {
            writeln!(out, "{name} is up to date: {}", archive.display())
        }
        PackageOutcome::Packaged { archive, entries } => {
            writeln!(out, "Packaged {name} into {}", archive.display())?;
            for entry in entries {
                writeln!(out, "  {entry}")?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tpkit_config::ComponentConfig;

    use super::*;

    fn report(outcome: PackageOutcome) -> PackageReport {
        PackageReport {
            config: ComponentConfig::new("Demo Plugin", "demo"),
            outcome,
        }
    }

    fn describe(report: &PackageReport) -> String {
        let mut out = Vec::new();
        describe_package(report, &mut out).expect("write");
        String::from_utf8(out).expect("utf-8")
    }

    #[test]
    fn up_to_date_archive_is_named() {
        let text = describe(&report(PackageOutcome::UpToDate {
            archive: PathBuf::from("/work/demo/Demo Plugin.tpp"),
        }));
        assert_eq!(text, "Demo Plugin is up to date: /work/demo/Demo Plugin.tpp\n");
    }

    #[test]
    fn packaged_archive_lists_entries() {
        let text = describe(&report(PackageOutcome::Packaged {
            archive: PathBuf::from("/work/demo/Demo Plugin.tpp"),
            entries: vec![
                "Demo Plugin/entry.tp".to_owned(),
                "Demo Plugin/demo".to_owned(),
            ],
        }));
        assert_eq!(
            text,
            "Packaged Demo Plugin into /work/demo/Demo Plugin.tpp\n  \
             Demo Plugin/entry.tp\n  Demo Plugin/demo\n"
        );
    }
}
