//! Config command - validation, tool checks and task inspection.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::Style;
use serde_json::json;

use life_config::{TaskKind, ToolCheck, ToolRegistry, task_summary, validate_tools};

use super::{Context, print_json};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate configuration structure and tool availability
    Validate,

    /// Check that every referenced tool is installed
    Check,

    /// List configured tasks with their tools
    List,

    /// List known tools and whether they are installed
    Tools,

    /// Show which config file is loaded
    Path,
}

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Validate => cmd_validate(ctx),
        ConfigCommand::Check => cmd_check(ctx),
        ConfigCommand::List => cmd_list(ctx),
        ConfigCommand::Tools => cmd_tools(ctx),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn cmd_validate(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let checks = validate_tools(&loaded.config, &ToolRegistry::builtin());
    let missing = checks.iter().filter(|c| !c.installed).count();

    if ctx.json_output {
        print_json(&json!({
            "path": loaded.path,
            "structure_issues": loaded.warnings,
            "tools": checks,
        }))?;
    } else {
        let green = Style::new().green();
        let yellow = Style::new().yellow();

        println!("Validating {}...\n", loaded.path.display());

        if loaded.warnings.is_empty() {
            println!("{} Configuration structure is valid\n", green.apply_to("✓"));
        } else {
            println!("Structure Issues:");
            for issue in &loaded.warnings {
                println!("  {} {}", yellow.apply_to("⚠"), issue);
            }
            println!();
        }

        if checks.is_empty() {
            println!("No tools found in configuration");
        } else {
            println!("Tool Availability:");
            print_checks(&checks);
            println!();
            if missing == 0 {
                println!("{} All required tools are installed", green.apply_to("✓"));
            }
        }
    }

    if missing > 0 {
        bail!("Some tools are not installed. See install hints above.");
    }
    if !ctx.json_output {
        println!("\nConfiguration validation complete!");
    }
    Ok(())
}

fn cmd_check(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let checks = validate_tools(&loaded.config, &ToolRegistry::builtin());
    let missing = checks.iter().filter(|c| !c.installed).count();

    if ctx.json_output {
        print_json(&checks)?;
    } else if checks.is_empty() {
        println!("No tools found in configuration");
    } else {
        println!("Checking tool availability...\n");
        print_checks(&checks);
        println!();
        if missing == 0 {
            println!("{} All tools are available", Style::new().green().apply_to("✓"));
        }
    }

    if missing > 0 {
        bail!("{} tool(s) missing", missing);
    }
    Ok(())
}

fn print_checks(checks: &[ToolCheck]) {
    for check in checks {
        println!("  {}: {}", check.tool, check.message);
    }
}

fn cmd_list(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let summary = task_summary(&loaded.config);

    if ctx.json_output {
        return print_json(&summary);
    }

    let registry = ToolRegistry::builtin();
    let bold = Style::new().bold();

    println!("Configured Tasks:\n");
    for kind in TaskKind::ALL {
        let tasks: Vec<_> = summary.iter().filter(|t| t.kind == kind).collect();
        if tasks.is_empty() {
            continue;
        }

        println!("{}", bold.apply_to(format!("{} Tasks:", kind.as_str().to_uppercase())));
        for task in tasks {
            println!("  {}", task.name);
            println!("    Description: {}", task.description);
            if task.tools.is_empty() {
                println!("    Tools: None");
            } else {
                let tools: Vec<String> = task
                    .tools
                    .iter()
                    .map(|tool| {
                        let mark = if registry.is_installed(tool) { "✓" } else { "✗" };
                        format!("{} {}", mark, tool)
                    })
                    .collect();
                println!("    Tools: {}", tools.join(", "));
            }
            if task.incremental {
                println!("    Incremental: Yes");
            }
            println!();
        }
    }
    Ok(())
}

fn cmd_tools(ctx: &Context) -> Result<()> {
    let registry = ToolRegistry::builtin();

    if ctx.json_output {
        let tools: Vec<_> = registry
            .list()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "install_hint": tool.install_hint,
                    "installed": registry.is_installed(&tool.name),
                })
            })
            .collect();
        return print_json(&tools);
    }

    let green = Style::new().green();
    let red = Style::new().red();

    println!("Registered Tools:\n");
    for tool in registry.list() {
        let installed = registry.is_installed(&tool.name);
        let status = if installed {
            green.apply_to("✓ Installed")
        } else {
            red.apply_to("✗ Not installed")
        };
        println!("{} - {}", tool.name, status);
        println!("  Description: {}", tool.description);
        if !installed {
            println!("  Install: {}", tool.install_hint);
        }
        println!();
    }
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    if ctx.json_output {
        return print_json(&json!({ "path": loaded.path }));
    }
    println!("{}", loaded.path.display());
    Ok(())
}
