// Command dispatcher: brings up the session, builds the catalog client and
// runs one subcommand, printing its result. Errors are returned to `main`,
// which prints them and exits non-zero.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::path::Path;

use crate::api::ApiClient;
use crate::auth::OAuthTokenIssuer;
use crate::catalog::{ArtifactDeletion, Catalog, CatalogEntry};
use crate::cli::{Cli, Command, CreateArgs, CurlArgs};
use crate::config::Config;
use crate::curl::{format_body, format_headers, write_output, CurlRequest};
use crate::host::{check_preconditions, CfCli};
use crate::poller::OperationResult;
use crate::session::{JsonFileStore, ServiceKind, Session};
use crate::ui::{self, Table, TerminalPrompt};

pub fn run(cli: Cli) -> Result<()> {
    let config = cli.global.config();
    let mut session = open_session(&config)?;
    let api = ApiClient::new(&config.catalog_url, config.http_timeout)
        .context("Failed to build HTTP client")?;
    let api = session.connect(api)?;
    let catalog = Catalog::new(&api, config.poll.clone());

    match cli.command {
        Command::Taxonomy => {
            let forest = catalog.taxonomy().context("Failed to get taxonomy")?;
            let mut out = std::io::stdout().lock();
            for root in &forest {
                root.print(&mut out, "")?;
            }
        }
        Command::AddTaxonomy { taxonomy } => {
            ui::say(&format!("Adding `{}` taxonomy...", taxonomy));
            catalog
                .add_taxonomy(&taxonomy)
                .context("Failed to add taxonomy")?;
            ui::ok();
        }
        Command::Analytics => {
            ui::say("Getting analytics list...");
            let analytics = catalog.analytics().context("Failed to get analytics list")?;
            ui::ok();
            let mut table = Table::new(&["Name", "Version", "Taxonomy Location", "Author", "Description"]);
            for a in analytics {
                table.add(vec![a.name, a.version, a.taxonomy_location, a.author, a.description]);
            }
            table.print()?;
        }
        Command::CreateAnalytic(args) => {
            let author = match &args.author {
                Some(author) => author.clone(),
                None => session.host().username().unwrap_or_default(),
            };
            let entry = new_entry(&args, author, Local::now().date_naive());
            catalog
                .create_analytic(&entry, &args.executable)
                .context("Failed to create analytic")?;
            ui::ok();
        }
        Command::AnalyticArtifacts { analytic } => {
            let artifacts = catalog
                .artifacts(&analytic)
                .context("Failed to get analytic artifacts")?;
            let mut table = Table::new(&["Filename", "Type", "Description"]);
            for a in artifacts {
                table.add(vec![a.filename, a.kind, a.description]);
            }
            table.print()?;
        }
        Command::GetAnalyticArtifact { analytic, file_name } => {
            let res = catalog
                .download_artifact(&analytic, &file_name)
                .context("Failed to get artifact")?;
            if res.status() == reqwest::StatusCode::OK {
                write_output(Path::new(&file_name), res.bytes())?;
            } else {
                ui::say(&res.text());
            }
        }
        Command::AddAnalyticArtifact {
            analytic,
            file_path,
            kind,
            description,
        } => {
            catalog
                .add_artifact(&analytic, &file_path, &kind, &description)
                .context("Failed to upload artifact")?;
            ui::ok();
        }
        Command::DeleteAnalyticArtifact { analytic, file_name } => {
            match catalog
                .delete_artifact(&analytic, &file_name)
                .context("Failed to delete artifact")?
            {
                ArtifactDeletion::Removed => ui::say("The artifact was removed from the catalog."),
                ArtifactDeletion::Refused(status) => ui::say(&format!(
                    "Failed to delete artifact. Response status code: {}",
                    status.as_u16()
                )),
            }
        }
        Command::RunAnalytic { analytic, input_file } => {
            let output = catalog
                .run_analytic(&analytic, &input_file)
                .context("Failed to run analytic")?;
            ui::say(&output);
        }
        Command::ValidateAnalytic { analytic, input_file } => {
            let spinner = ui::spinner("Validating analytic...");
            let result = catalog.validate_analytic(&analytic, &input_file);
            spinner.finish_and_clear();
            report(result.context("Failed to validate analytic")?);
        }
        Command::DeleteAnalytic { analytic } => {
            catalog
                .delete_analytic(&analytic)
                .context("Failed to delete analytic")?;
            ui::ok();
        }
        Command::AnalyticLogs { analytic } => {
            let logs = catalog
                .analytic_logs(&analytic)
                .context("Failed to get analytic logs")?;
            ui::say(&logs);
        }
        Command::DeployAnalytic(args) => {
            let spinner = ui::spinner("Deploying analytic...");
            let result = catalog.deploy_analytic(&args.analytic, &args.deployment());
            spinner.finish_and_clear();
            report(result.context("Failed to deploy analytic")?);
        }
        Command::AnalyticsCurl(args) => curl(&api, args)?,
    }
    Ok(())
}

/// Load persisted state, check the cf CLI is ready and make sure the
/// catalog service is bound before any request is made. A corrupt state
/// file is reported before any host check.
fn open_session(config: &Config) -> Result<Session> {
    let mut session = Session::load(
        Box::new(JsonFileStore::new(config.state_file())),
        Box::new(CfCli::new(&config.cf_home, config.cf_config_file())),
        Box::new(TerminalPrompt),
        Box::new(OAuthTokenIssuer),
        config.token_url_template.clone(),
    )
    .context("Loading config failed")?;
    check_preconditions(session.host())?;
    session.ensure_service_id(ServiceKind::AnalyticsCatalog)?;
    Ok(session)
}

/// Only the message of a finished operation is shown, whatever its status.
fn report(result: OperationResult) {
    ui::say(&result.message);
}

fn curl(api: &ApiClient, args: CurlArgs) -> Result<()> {
    let request = CurlRequest {
        path: args.path,
        method: args.method,
        headers: args.headers,
        data: args.data,
    };
    let res = request.send(api).context("Error creating request")?;

    if args.include_headers {
        ui::say(&format_headers(&res));
    }
    match args.output {
        Some(path) => write_output(&path, res.bytes()).context("Error creating request")?,
        None => ui::say(&format_body(&res)),
    }
    Ok(())
}

fn new_entry(args: &CreateArgs, author: String, today: NaiveDate) -> CatalogEntry {
    CatalogEntry {
        name: args.name.clone(),
        author,
        description: args.description.clone(),
        version: args
            .version
            .clone()
            .unwrap_or_else(|| default_version(today)),
        supported_language: args
            .language
            .clone()
            .unwrap_or_else(|| language_for(&args.executable).to_string()),
        taxonomy_location: args.taxonomy.clone(),
        custom_metadata: args.metadata.clone(),
        ..Default::default()
    }
}

/// `V1-` followed by the abbreviated month and unpadded day, e.g. `V1-Jan-2`.
pub fn default_version(today: NaiveDate) -> String {
    today.format("V1-%b-%-d").to_string()
}

/// Guess the supported language from the executable's extension.
pub fn language_for(executable: &Path) -> &'static str {
    match executable.extension().and_then(|e| e.to_str()) {
        Some("zip") => "Python",
        Some("jar") => "Java",
        _ => "",
    }
}
