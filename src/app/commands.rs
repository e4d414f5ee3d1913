use crate::app::context::AppContext;
use crate::config::cli::{CalcArgs, Command, RecipeCommand, StrainCommand};
use crate::core::compliance::{self, ComplianceReport};
use crate::core::instructions::{self, render_steps};
use crate::core::recipes::RecipeFilter;
use crate::domain::model::{NutrientLine, Reading, Recipe, SavedRecipe, Strain};
use crate::domain::ports::{Storage, StrainSource};
use crate::utils::error::{HydroError, Result};
use crate::utils::monitor::OperationMonitor;
use std::path::Path;

/// Runs every subcommand except `serve`.
pub async fn execute<S: Storage + Clone>(
    command: Command,
    ctx: &mut AppContext<S>,
    monitor: &mut OperationMonitor,
) -> Result<()> {
    match command {
        Command::Lines { name } => match name {
            Some(name) => print_line(ctx.catalog.line(&name)?),
            None => {
                for line in ctx.catalog.lines() {
                    println!("{:<22} {}", line.name, line.description);
                }
            }
        },
        Command::Calculate {
            calc,
            json,
            save,
            tags,
        } => {
            let recipe = calculate(ctx, &calc, monitor)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&recipe)?);
            } else {
                print_recipe(&recipe);
            }
            if let Some(name) = save {
                let strain = recipe.strain.clone();
                ctx.recipes
                    .save_with_metadata(&name, recipe, strain, tags)
                    .await?;
                println!("✅ Saved recipe '{}'", name);
            }
        }
        Command::Instructions { calc } => {
            let recipe = calculate(ctx, &calc, monitor)?;
            let steps = monitor.track("instructions", || {
                instructions::generate_mixing_instructions(&recipe)
            });
            print!("{}", render_steps(&steps));
        }
        Command::Protocol { calc } => {
            let recipe = calculate(ctx, &calc, monitor)?;
            let protocol = monitor.track("protocol", || instructions::protocol(&recipe));
            print!("{}", protocol.render_text());
        }
        Command::Check { recipe, reading } => {
            let saved = ctx.recipes.require(&recipe)?;
            let reading = Reading::from(&reading);
            let report = monitor.track("compliance", || compliance::check(&saved.recipe, &reading));
            print_report(&report);
        }
        Command::Troubleshoot => {
            for advice in compliance::troubleshooting_guide() {
                println!("⚠️  {} ({:?})", advice.issue, advice.severity);
                println!("   • {}", advice.solution);
            }
        }
        Command::Strains(command) => strains(command, ctx).await?,
        Command::Recipes(command) => recipes(command, ctx).await?,
        Command::Serve { .. } => {
            return Err(HydroError::ConfigError {
                message: "serve is handled by the binary entry point".to_string(),
            })
        }
    }
    Ok(())
}

fn calculate<S: Storage + Clone>(
    ctx: &AppContext<S>,
    calc: &CalcArgs,
    monitor: &mut OperationMonitor,
) -> Result<Recipe> {
    let strain = calc
        .strain
        .as_deref()
        .map(|name| ctx.strains.require(name).cloned())
        .transpose()?;
    let defaults = &ctx.config.defaults;
    let request = calc.to_request(
        &defaults.nutrient_line,
        defaults.unit_system,
        defaults.strength_percent,
        strain,
    );
    let calculator = ctx.calculator();
    monitor.track("calculate", || calculator.calculate(&request))
}

async fn strains<S: Storage + Clone>(command: StrainCommand, ctx: &mut AppContext<S>) -> Result<()> {
    match command {
        StrainCommand::List => {
            if ctx.strains.is_empty() {
                println!("No strains stored yet");
            }
            for strain in ctx.strains.list() {
                print_strain_row(strain);
            }
        }
        StrainCommand::Show { name } => {
            println!("{}", serde_json::to_string_pretty(ctx.strains.require(&name)?)?);
        }
        StrainCommand::Add {
            name,
            category,
            feeding,
            ec,
            ph,
            notes,
            tags,
        } => {
            let strain = Strain {
                name: name.clone(),
                category,
                feeding_type: feeding,
                ec_range: ec,
                ph_range: ph,
                notes,
                tags,
            };
            let replaced = ctx.strains.upsert(strain).await?;
            println!(
                "✅ {} strain '{}'",
                if replaced { "Updated" } else { "Added" },
                name
            );
        }
        StrainCommand::Remove { name } => {
            if ctx.strains.remove(&name).await? {
                println!("🗑️  Removed strain '{}'", name);
            } else {
                return Err(HydroError::not_found("strain", name));
            }
        }
        StrainCommand::Search { query, remote } => {
            if remote {
                for strain in require_client(ctx)?.search(&query).await? {
                    print_strain_row(&strain);
                }
            } else {
                for strain in ctx.strains.search(&query) {
                    print_strain_row(strain);
                }
            }
        }
        StrainCommand::Categories { remote } => {
            let categories = if remote {
                require_client(ctx)?.categories().await?
            } else {
                ctx.strains.categories()
            };
            for category in categories {
                println!("{}", category);
            }
        }
        StrainCommand::Generate { category, save } => {
            let Some(strain) = require_client(ctx)?.generate(&category).await? else {
                println!("⚠️  The strain service returned nothing for '{}'", category);
                return Ok(());
            };
            println!("{}", serde_json::to_string_pretty(&strain)?);
            if save {
                ctx.strains.upsert(strain).await?;
                println!("✅ Saved to the local strain database");
            }
        }
    }
    Ok(())
}

fn require_client<S: Storage + Clone>(ctx: &AppContext<S>) -> Result<crate::adapters::StrainApiClient> {
    ctx.strain_client()?
        .ok_or_else(|| HydroError::MissingConfigError {
            field: "strain_api.base_url".to_string(),
        })
}

async fn recipes<S: Storage + Clone>(command: RecipeCommand, ctx: &mut AppContext<S>) -> Result<()> {
    match command {
        RecipeCommand::List => {
            if ctx.recipes.is_empty() {
                println!("No saved recipes");
            }
            for name in ctx.recipes.list() {
                println!("{}", name);
            }
        }
        RecipeCommand::Show { name } => {
            let saved = ctx.recipes.require(&name)?;
            print_saved(saved);
            print_recipe(&saved.recipe);
        }
        RecipeCommand::Delete { name } => {
            if !ctx.recipes.delete(&name).await? {
                return Err(HydroError::not_found("recipe", name));
            }
            println!("🗑️  Deleted recipe '{}'", name);
        }
        RecipeCommand::History {
            strain,
            stage,
            tags,
        } => {
            let filter = RecipeFilter {
                strain,
                growth_stage: stage,
                tags,
            };
            for saved in ctx.recipes.history(&filter) {
                print_saved(saved);
            }
        }
        RecipeCommand::Export { name, output } => {
            let json = ctx.recipes.export(&name)?;
            write_or_print(output.as_deref(), &json).await?;
        }
        RecipeCommand::Import { name, file } => {
            let json = tokio::fs::read_to_string(&file).await?;
            ctx.recipes.import(&name, &json).await?;
            println!("✅ Imported '{}' from {}", name, file.display());
        }
        RecipeCommand::Duplicate { name, new_name } => {
            ctx.recipes.duplicate(&name, &new_name).await?;
            println!("✅ Duplicated '{}' as '{}'", name, new_name);
        }
        RecipeCommand::Result {
            name,
            reading,
            notes,
        } => {
            let reading = Reading::from(&reading);
            let report = compliance::check(&ctx.recipes.require(&name)?.recipe, &reading);
            ctx.recipes.add_result(&name, reading, notes).await?;
            print_report(&report);
            println!("📝 Logged result for '{}'", name);
        }
        RecipeCommand::Csv { name, output } => {
            let csv = ctx.recipes.export_csv(&name)?;
            write_or_print(output.as_deref(), &csv).await?;
        }
    }
    Ok(())
}

async fn write_or_print(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(path, content).await?;
            println!("📁 Written to {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn print_line(line: &NutrientLine) {
    println!("{}\n{}\n", line.name, line.description);
    println!("Base nutrients:");
    for p in &line.base_nutrients {
        println!("  {:<24} {:>5} {}/gal  {}", p.name, p.max_strength, p.unit, p.description);
    }
    if !line.supplements.is_empty() {
        println!("Supplements:");
        for p in &line.supplements {
            println!("  {:<24} {:>5} {}/gal  {}", p.name, p.max_strength, p.unit, p.description);
        }
    }
}

fn print_recipe(recipe: &Recipe) {
    println!(
        "{} {} | {} | {} | {}% strength",
        recipe.growth_stage.emoji(),
        recipe.nutrient_line,
        recipe.growth_stage,
        recipe.volume_label(),
        recipe.strength_percent
    );
    if let Some(strain) = &recipe.strain {
        println!("Strain: {} ({} feeder)", strain, recipe.feeding_type);
    }
    if recipe.entries.iter().all(|e| e.amount == 0.0) {
        println!("💧 Plain pH-adjusted water only (flush)");
    }
    for entry in &recipe.entries {
        println!(
            "  {:<24} {:>8}  ({} {}/gal, {} {}/L)",
            entry.product,
            entry.amount_label(),
            entry.per_gallon,
            entry.unit,
            entry.per_liter,
            entry.unit
        );
    }
    println!("Target EC: {}  Target pH: {}", recipe.target_ec, recipe.target_ph);
}

fn print_saved(saved: &SavedRecipe) {
    println!(
        "#{} {} (v{}, modified {}) {} {} {}",
        saved.recipe_id,
        saved.name,
        saved.version,
        saved.last_modified,
        saved.recipe.nutrient_line,
        saved.recipe.growth_stage,
        saved.tags.join(",")
    );
}

fn print_strain_row(strain: &Strain) {
    println!(
        "{:<24} {:<18} {} feeder",
        strain.name,
        strain.category.as_deref().unwrap_or("-"),
        strain.feeding_type
    );
}

fn print_report(report: &ComplianceReport) {
    for (label, assessment) in [
        ("EC", report.ec),
        ("pH", report.ph),
        ("Temp °F", report.temperature_f),
    ] {
        if let Some(a) = assessment {
            println!("{:<8} {:>6} target {}  {:?}", label, a.value, a.target, a.status);
        }
    }
    println!("Overall: {:?}", report.compliance);
    for advice in &report.advice {
        println!("⚠️  {}: {}", advice.issue, advice.solution);
    }
}
