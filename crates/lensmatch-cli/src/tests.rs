use super::*;

#[test]
fn parses_migrate_command() {
    let cli = Cli::try_parse_from(["lensmatch-cli", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Migrate)));
}

#[test]
fn parses_run_batch_command() {
    let cli =
        Cli::try_parse_from(["lensmatch-cli", "run-batch"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::RunBatch)));
}

#[test]
fn parses_refresh_with_lens_id() {
    let cli = Cli::try_parse_from(["lensmatch-cli", "refresh", "sony-fe-50"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Refresh { ref lens_id }) if lens_id == "sony-fe-50"
    ));
}

#[test]
fn refresh_requires_lens_id() {
    assert!(Cli::try_parse_from(["lensmatch-cli", "refresh"]).is_err());
}

#[test]
fn parses_prices_with_lens_id() {
    let cli = Cli::try_parse_from(["lensmatch-cli", "prices", "nikon-50"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Prices { ref lens_id }) if lens_id == "nikon-50"
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["lensmatch-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}
