//! One function per subcommand. Each builds the plan via `ppm-solver`,
//! prints it, confirms unless `--yes`, then hands it to
//! `ppm-transaction`.

use crate::cli::Commands;
use crate::engine::Engine;
use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_BORDERS_ONLY, Table};
use dialoguer::Confirm;
use ppm_index::{DepSpec, VersionRange};
use ppm_solver::{plan_autoremove, plan_remove, plan_upgrade, solve, ActionPlan, PlannedOp};
use ppm_store::InstallState;
use ppm_sysdep::NullProbe;
use ppm_transaction::{check_installed, fetch_all, fix_broken, precheck, stage_plan, Applier, IntegrityStatus};

pub fn run(engine: &mut Engine, command: Commands, assume_yes: bool) -> Result<()> {
    match command {
        Commands::Install { names } => {
            let requests: Vec<DepSpec> = names
                .iter()
                .map(|n| DepSpec { name: n.clone(), range: VersionRange::any() })
                .collect();
            let installed = crate::engine::installed_refs(&engine.index, &engine.state);
            let plan = solve(&engine.index, &installed, &requests, false)
                .context("computing install plan")?;
            apply_plan(&engine.config, &mut engine.state, plan, &names, assume_yes)
        }
        Commands::Upgrade { names } => {
            let installed = crate::engine::installed_refs(&engine.index, &engine.state);
            let plan = plan_upgrade(&engine.index, &installed, &names).context("computing upgrade plan")?;
            apply_plan(&engine.config, &mut engine.state, plan, &[], assume_yes)
        }
        Commands::Remove { names } => {
            let installed = crate::engine::installed_refs(&engine.index, &engine.state);
            let plan = plan_remove(&engine.index, &installed, &names).context("computing removal plan")?;
            apply_plan(&engine.config, &mut engine.state, plan, &[], assume_yes)
        }
        Commands::Autoremove => {
            let installed = crate::engine::installed_refs(&engine.index, &engine.state);
            let manually = engine.state.manually_installed().to_vec();
            let plan = plan_autoremove(&engine.index, &installed, &manually);
            if plan.is_empty() {
                println!("nothing to remove");
                return Ok(());
            }
            apply_plan(&engine.config, &mut engine.state, plan, &[], assume_yes)
        }
        Commands::List => {
            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            table.set_header(vec!["name", "version", "manual"]);
            let mut packages: Vec<_> = engine.state.iter().collect();
            packages.sort_by(|a, b| a.name.cmp(&b.name));
            for pkg in packages {
                let manual = if engine.state.is_manually_installed(&pkg.name) { "yes" } else { "no" };
                table.add_row(vec![pkg.name.as_str(), pkg.version.as_str(), manual]);
            }
            println!("{table}");
            Ok(())
        }
        Commands::Search { query } => {
            let mut results = engine.index.search(&query);
            results.sort_by(|a, b| a.name.cmp(&b.name));
            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            table.set_header(vec!["name", "version", "description"]);
            for pkg in results {
                table.add_row(vec![pkg.name.as_str(), pkg.version.as_str(), pkg.description.as_str()]);
            }
            println!("{table}");
            Ok(())
        }
        Commands::Show { name } => {
            let Some(pkg) = engine.index.describe(&name) else {
                bail!("unknown package: {name}");
            };
            println!("name:        {}", pkg.name);
            println!("version:     {}", pkg.version.as_str());
            println!("description: {}", pkg.description);
            println!("source:      {}", pkg.source_name);
            if !pkg.mmpack_deps.is_empty() {
                println!("depends:");
                for dep in &pkg.mmpack_deps {
                    println!("  {}", dep.name);
                }
            }
            if !pkg.sys_deps.is_empty() {
                println!("sysdepends:");
                for dep in &pkg.sys_deps {
                    println!("  {dep}");
                }
            }
            Ok(())
        }
        Commands::Rdepends { name } => {
            let rdeps = engine.index.reverse_dependents(&name);
            if rdeps.is_empty() {
                println!("nothing depends on {name}");
            } else {
                for dep in rdeps {
                    println!("{dep}");
                }
            }
            Ok(())
        }
        Commands::CheckIntegrity { name } => {
            let reports = check_installed(&engine.config.prefix_root, &engine.state, name.as_deref());
            let mut any_broken = false;
            for report in reports {
                match report.status {
                    IntegrityStatus::Ok => println!("{}: ok", report.name),
                    IntegrityStatus::Fail { bad_paths } => {
                        any_broken = true;
                        println!("{}: BROKEN ({} file(s) modified)", report.name, bad_paths.len());
                        for path in bad_paths {
                            println!("  {path}");
                        }
                    }
                }
            }
            if any_broken {
                bail!("one or more installed packages failed integrity verification");
            }
            Ok(())
        }
        Commands::FixBroken { names } => {
            let cache = engine.cache()?;
            let state = std::mem::take(&mut engine.state);
            engine.state = fix_broken(&engine.config.prefix_root, state, &engine.index, &cache, &names)
                .context("repairing broken packages")?;
            ppm_store::save(&engine.config.prefix_root, &engine.state).context("saving install state")?;
            println!("repaired: {}", names.join(", "));
            Ok(())
        }
        Commands::Download { name } => {
            let Some(pkg) = engine.index.describe(&name) else {
                bail!("unknown package: {name}");
            };
            let cache = engine.cache()?;
            let path = cache.fetch_only(pkg).context("downloading archive")?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn apply_plan(
    config: &ppm_config::PrefixConfig,
    state: &mut InstallState,
    plan: ActionPlan<'_>,
    requested: &[String],
    assume_yes: bool,
) -> Result<()> {
    if plan.is_empty() {
        println!("nothing to do");
        return Ok(());
    }

    print_plan(&plan);

    if !assume_yes
        && !Confirm::new()
            .with_prompt("proceed?")
            .default(false)
            .interact()
            .unwrap_or(false)
    {
        println!("aborted");
        return Ok(());
    }

    let mut staged = stage_plan(&plan);
    precheck(&staged, &NullProbe).context("checking system dependencies")?;

    let fetcher = ppm_cache::HttpFetcher::new().context("building HTTP client")?;
    let cache = ppm_cache::Cache::new(config.effective_cache_dir(), fetcher);
    fetch_all(&mut staged, &cache).context("fetching archives")?;

    let taken_state = std::mem::take(state);
    let mut applier = Applier::new(&config.prefix_root, taken_state);
    applier.apply(&staged, requested).context("applying transaction")?;
    *state = applier.into_state();

    println!("done");
    Ok(())
}

fn print_plan(plan: &ActionPlan<'_>) {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["action", "package", "version"]);
    for op in plan {
        match op {
            PlannedOp::Install { pkg } => {
                table.add_row(vec!["install", pkg.name.as_str(), pkg.version.as_str()]);
            }
            PlannedOp::Upgrade { old, new } => {
                table.add_row(vec![
                    "upgrade",
                    new.name.as_str(),
                    &format!("{} -> {}", old.version.as_str(), new.version.as_str()),
                ]);
            }
            PlannedOp::Remove { pkg } => {
                table.add_row(vec!["remove", pkg.name.as_str(), pkg.version.as_str()]);
            }
        }
    }
    println!("{table}");
}
