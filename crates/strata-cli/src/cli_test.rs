use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn parses_rollback_strategy() {
    let cli = Cli::try_parse_from(["strata", "rollback", "--strategy", "down-to:002"]).unwrap();
    match cli.command {
        Commands::Rollback(args) => {
            assert_eq!(args.strategy.to_string(), "down-to:002");
            assert!(!args.dry_run);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn rejects_zero_rollback_steps() {
    assert!(Cli::try_parse_from(["strata", "rollback", "--strategy", "steps:0"]).is_err());
}

#[test]
fn to_and_steps_conflict() {
    assert!(Cli::try_parse_from(["strata", "migrate", "--to", "002", "--steps", "1"]).is_err());
}

#[test]
fn confirm_table_requires_drop() {
    assert!(
        Cli::try_parse_from(["strata", "mark-all-completed", "--confirm-table", "t"]).is_err()
    );
    assert!(Cli::try_parse_from([
        "strata",
        "mark-all-completed",
        "--drop",
        "--confirm-table",
        "t"
    ])
    .is_ok());
}

#[test]
fn global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["strata", "status", "--database", ":memory:", "-o", "json"])
        .unwrap();
    assert_eq!(cli.global.database.as_deref(), Some(":memory:"));
    match cli.command {
        Commands::Status(args) => assert_eq!(args.output, OutputFormat::Json),
        other => panic!("unexpected command {other:?}"),
    }
}
