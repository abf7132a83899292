use super::*;
use clap::CommandFactory;

#[test]
fn test_verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "cairn",
        "migrate",
        "--force-unlock",
        "-p",
        "proj",
        "-t",
        ":memory:",
        "-m",
        "db/other",
        "-v",
    ])
    .unwrap();

    assert!(cli.global.verbose);
    assert_eq!(cli.global.project_dir, "proj");
    assert_eq!(cli.global.target.as_deref(), Some(":memory:"));
    assert_eq!(cli.global.migrations_dir.as_deref(), Some("db/other"));
    match cli.command {
        Commands::Migrate(args) => assert!(args.force_unlock),
        other => panic!("expected migrate, got {other:?}"),
    }
}

#[test]
fn test_project_dir_defaults_to_current_directory() {
    let cli = Cli::try_parse_from(["cairn", "status"]).unwrap();
    assert_eq!(cli.global.project_dir, ".");
    assert!(cli.global.config.is_none());
}

#[test]
fn test_new_requires_a_name() {
    assert!(Cli::try_parse_from(["cairn", "new"]).is_err());
    let cli = Cli::try_parse_from(["cairn", "new", "create_users"]).unwrap();
    assert!(matches!(cli.command, Commands::New(ref args) if args.name == "create_users"));
}
