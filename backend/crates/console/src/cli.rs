//! Command-line surface of the console. Each subcommand maps onto one view:
//! the auth form, the target and alert rule forms, the AI settings form, the
//! dashboard, the config preview and the simulated API panel.

use clap::{Args, Parser, Subcommand};
use promeconfig_common::{RelabelAction, RenderOptions, ScrapeInterval};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ConsoleConfig;
use crate::controller::AppController;
use crate::error::{ConsoleError, Result};
use crate::views::ai_settings_form::mask_api_key;
use crate::views::{
    AiSettingsForm, AlertRuleForm, ApiPanel, AuthForm, AuthMode, ConfigFile, RelabelList, RelabelRuleForm,
    TargetForm,
};

#[derive(Parser, Debug)]
#[command(name = "promeconfig", author, version, about = "PromeConfig admin console", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account and sign in
    Signup(CredentialArgs),
    /// Sign in with an existing account
    Signin(CredentialArgs),
    /// Sign out and forget the stored session
    Signout,
    /// Show the signed-in user
    Whoami,
    /// Manage scrape targets
    #[command(subcommand)]
    Targets(TargetCommand),
    /// Manage alert rules
    #[command(subcommand)]
    Rules(RuleCommand),
    /// Manage AI assistant settings
    #[command(subcommand)]
    Ai(AiCommand),
    /// Summary of the stored configuration
    Dashboard,
    /// Show or write the generated prometheus.yml and alerts file
    Preview(PreviewArgs),
    /// Simulated Prometheus API actions
    #[command(subcommand)]
    Api(ApiCommand),
    /// Stay running and follow the session until it ends or Ctrl-C
    Watch,
}

#[derive(Args, Debug, Default)]
pub struct PreviewArgs {
    /// Which file to print: prometheus or alerts
    #[arg(long, default_value = "prometheus")]
    pub file: ConfigFile,
    /// Write both files into this directory instead of printing
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Alertmanager address; repeat for several, defaults to alertmanager:9093
    #[arg(long = "alertmanager")]
    pub alertmanagers: Vec<String>,
    /// Leave the alerting section out
    #[arg(long, conflicts_with = "alertmanagers")]
    pub no_alerting: bool,
    /// Name of the rules file referenced from prometheus.yml
    #[arg(long)]
    pub rule_file: Option<String>,
}

impl PreviewArgs {
    pub fn render_options(&self) -> RenderOptions {
        let mut options = RenderOptions::default();
        if self.no_alerting {
            options.alertmanagers.clear();
        } else if !self.alertmanagers.is_empty() {
            options.alertmanagers = self.alertmanagers.clone();
        }
        if let Some(rule_file) = self.rule_file.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
            options.rule_file = rule_file.to_string();
        }
        options
    }
}

#[derive(Args, Debug)]
pub struct CredentialArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
}

#[derive(Subcommand, Debug)]
pub enum TargetCommand {
    List,
    Add(TargetArgs),
    Edit {
        id: String,
        #[command(flatten)]
        args: TargetArgs,
        /// Remove all relabel rules
        #[arg(long)]
        clear_relabel: bool,
        /// Remove all metric relabel rules
        #[arg(long)]
        clear_metric_relabel: bool,
    },
    Rm {
        id: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// Job name
    #[arg(long = "job")]
    pub job_name: Option<String>,
    /// Comma-separated host:port list
    #[arg(long)]
    pub targets: Option<String>,
    /// One of 5s, 10s, 15s, 30s, 1m, 5m
    #[arg(long)]
    pub interval: Option<ScrapeInterval>,
    #[arg(long = "path")]
    pub metrics_path: Option<String>,
    /// Relabel rule as `key=value` pairs joined by ';', e.g.
    /// "action=hashmod;source_labels=__address__;target_label=__tmp;modulus=4"
    #[arg(long = "relabel")]
    pub relabel: Vec<String>,
    /// Metric relabel rule, same syntax as --relabel
    #[arg(long = "metric-relabel")]
    pub metric_relabel: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum RuleCommand {
    List,
    Add(RuleArgs),
    Edit {
        id: String,
        #[command(flatten)]
        args: RuleArgs,
    },
    Rm {
        id: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct RuleArgs {
    #[arg(long = "name")]
    pub alert_name: Option<String>,
    /// PromQL expression
    #[arg(long)]
    pub expr: Option<String>,
    /// Duration before firing, e.g. 5m
    #[arg(long = "for")]
    pub for_duration: Option<String>,
    /// key=value pairs separated by commas
    #[arg(long)]
    pub labels: Option<String>,
    #[arg(long)]
    pub annotations: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum AiCommand {
    Show,
    Save(AiArgs),
    Rm,
}

#[derive(Args, Debug, Default)]
pub struct AiArgs {
    #[arg(long)]
    pub provider: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub api_key: Option<String>,
    #[arg(long)]
    pub base_url: Option<String>,
    #[arg(long)]
    pub temperature: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ApiCommand {
    /// Pretend to contact Prometheus and print a status snapshot
    Test {
        #[arg(long)]
        url: Option<String>,
    },
    /// Pretend to trigger a configuration reload
    Reload {
        #[arg(long)]
        url: Option<String>,
    },
}

const RULE_KEYS: [&str; 7] = ["action", "source_labels", "separator", "target_label", "regex", "modulus", "replacement"];

/// Parses the `--relabel` syntax into a form row. Fields are `key=value`
/// joined by ';'. A segment that does not start with a known key belongs to
/// the previous value, so regexes and separators may contain ';'.
pub fn parse_relabel_spec(spec: &str) -> Result<RelabelRuleForm> {
    let mut fields: Vec<(String, String)> = Vec::new();
    for segment in spec.split(';') {
        let known = segment
            .split_once('=')
            .filter(|(key, _)| RULE_KEYS.contains(&key.trim()));
        match (known, fields.last_mut()) {
            (Some((key, value)), _) => fields.push((key.trim().to_string(), value.to_string())),
            (None, Some((_, value))) => {
                value.push(';');
                value.push_str(segment);
            }
            (None, None) if segment.trim().is_empty() => {}
            (None, None) => {
                return Err(ConsoleError::Config(format!("relabel rule '{spec}' must start with a key=value field")));
            }
        }
    }

    let mut form = RelabelRuleForm::default();
    for (key, value) in fields {
        match key.as_str() {
            "action" => {
                form.action = value.parse::<RelabelAction>().map_err(ConsoleError::Config)?;
            }
            "source_labels" => form.source_labels = value,
            "separator" => form.separator = value,
            "target_label" => form.target_label = value,
            "regex" => form.regex = value,
            "modulus" => form.modulus = value,
            "replacement" => form.replacement = value,
            _ => {}
        }
    }
    Ok(form)
}

fn apply_target_args(form: &mut TargetForm, args: TargetArgs) -> Result<()> {
    if let Some(job_name) = args.job_name {
        form.job_name = job_name;
    }
    if let Some(targets) = args.targets {
        form.targets = targets;
    }
    if let Some(interval) = args.interval {
        form.scrape_interval = interval;
    }
    if let Some(path) = args.metrics_path {
        form.metrics_path = path;
    }
    for (list, specs) in [(RelabelList::Relabel, args.relabel), (RelabelList::MetricRelabel, args.metric_relabel)] {
        if specs.is_empty() {
            continue;
        }
        let rules = specs.iter().map(|s| parse_relabel_spec(s)).collect::<Result<Vec<_>>>()?;
        *form.rules_mut(list) = rules;
    }
    Ok(())
}

fn apply_rule_args(form: &mut AlertRuleForm, args: RuleArgs) {
    if let Some(name) = args.alert_name {
        form.alert_name = name;
    }
    if let Some(expr) = args.expr {
        form.expr = expr;
    }
    if let Some(for_duration) = args.for_duration {
        form.for_duration = for_duration;
    }
    if let Some(labels) = args.labels {
        form.labels = labels;
    }
    if let Some(annotations) = args.annotations {
        form.annotations = annotations;
    }
}

fn apply_ai_args(form: &mut AiSettingsForm, args: AiArgs) {
    if let Some(provider) = args.provider {
        form.provider = provider;
    }
    if let Some(model) = args.model {
        form.model = model;
    }
    if let Some(api_key) = args.api_key {
        form.api_key = api_key;
    }
    if let Some(base_url) = args.base_url {
        form.base_url = base_url;
    }
    if let Some(temperature) = args.temperature {
        form.temperature = temperature;
    }
}

fn require_auth(controller: &AppController) -> Result<()> {
    if controller.is_authenticated() {
        Ok(())
    } else {
        Err(ConsoleError::Unauthorized)
    }
}

async fn authenticate(controller: &AppController, mode: AuthMode, args: CredentialArgs) -> Result<()> {
    let form = AuthForm { mode, email: args.email, password: args.password, error: None };
    let user = match form.mode {
        AuthMode::SignIn => controller.sign_in(&form.email, &form.password).await?,
        AuthMode::SignUp => controller.sign_up(&form.email, &form.password).await?,
    };
    println!("{}: signed in as {}", form.submit_label(), user.email);
    Ok(())
}

/// Runs one subcommand against an initialised controller.
pub async fn execute(command: Command, controller: Arc<AppController>, config: &ConsoleConfig) -> Result<()> {
    match command {
        Command::Signup(args) => authenticate(&controller, AuthMode::SignUp, args).await,
        Command::Signin(args) => authenticate(&controller, AuthMode::SignIn, args).await,
        Command::Signout => {
            controller.sign_out().await?;
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => {
            let user = controller.current_user().ok_or(ConsoleError::Unauthorized)?;
            println!("{} ({})", user.email, user.id);
            Ok(())
        }
        Command::Targets(cmd) => {
            require_auth(&controller)?;
            run_targets(&controller, cmd).await
        }
        Command::Rules(cmd) => {
            require_auth(&controller)?;
            run_rules(&controller, cmd).await
        }
        Command::Ai(cmd) => {
            require_auth(&controller)?;
            run_ai(&controller, cmd).await
        }
        Command::Dashboard => {
            require_auth(&controller)?;
            print!("{}", controller.dashboard().await);
            Ok(())
        }
        Command::Preview(args) => {
            require_auth(&controller)?;
            preview(&controller, args).await
        }
        Command::Api(cmd) => run_api(cmd).await,
        Command::Watch => {
            require_auth(&controller)?;
            watch(controller, config.session_poll_interval()).await
        }
    }
}

async fn run_targets(controller: &AppController, cmd: TargetCommand) -> Result<()> {
    match cmd {
        TargetCommand::List => {
            let targets = controller.targets().await;
            if targets.is_empty() {
                println!("No scrape targets configured yet.");
            }
            for t in targets {
                let relabel = t.relabel_configs.as_ref().map_or(0, Vec::len);
                let metric_relabel = t.metric_relabel_configs.as_ref().map_or(0, Vec::len);
                println!(
                    "{}  {:<24} every {:<4} {}{}  relabel={} metric_relabel={}",
                    t.id,
                    t.job_name,
                    t.scrape_interval,
                    t.targets.join(","),
                    t.metrics_path,
                    relabel,
                    metric_relabel
                );
            }
            Ok(())
        }
        TargetCommand::Add(args) => {
            let mut form = TargetForm::new();
            apply_target_args(&mut form, args)?;
            let created = controller.create_target(form.to_new_target()?).await?;
            println!("Created target {} ({})", created.job_name, created.id);
            Ok(())
        }
        TargetCommand::Edit { id, args, clear_relabel, clear_metric_relabel } => {
            let existing = controller
                .targets()
                .await
                .into_iter()
                .find(|t| t.id == id)
                .ok_or_else(|| ConsoleError::NotFound(format!("target {id}")))?;
            let mut form = TargetForm::from_target(&existing);
            apply_target_args(&mut form, args)?;
            if clear_relabel {
                form.rules_mut(RelabelList::Relabel).clear();
            }
            if clear_metric_relabel {
                form.rules_mut(RelabelList::MetricRelabel).clear();
            }
            let editing = form.editing_id().unwrap_or(&id).to_string();
            let updated = controller.update_target(&editing, form.to_patch()?).await?;
            println!("Updated target {} ({})", updated.job_name, updated.id);
            Ok(())
        }
        TargetCommand::Rm { id } => {
            controller.delete_target(&id).await?;
            println!("Deleted target {id}");
            Ok(())
        }
    }
}

async fn run_rules(controller: &AppController, cmd: RuleCommand) -> Result<()> {
    match cmd {
        RuleCommand::List => {
            let rules = controller.alert_rules().await;
            if rules.is_empty() {
                println!("No alert rules configured yet.");
            }
            for r in rules {
                let severity = r.labels.get("severity").map(String::as_str).unwrap_or("-");
                println!("{}  {:<24} for {:<5} severity={}  {}", r.id, r.alert_name, r.for_duration, severity, r.expr);
            }
            Ok(())
        }
        RuleCommand::Add(args) => {
            let mut form = AlertRuleForm::new();
            apply_rule_args(&mut form, args);
            let created = controller.create_alert_rule(form.to_new_rule()?).await?;
            println!("Created alert rule {} ({})", created.alert_name, created.id);
            Ok(())
        }
        RuleCommand::Edit { id, args } => {
            let existing = controller
                .alert_rules()
                .await
                .into_iter()
                .find(|r| r.id == id)
                .ok_or_else(|| ConsoleError::NotFound(format!("alert rule {id}")))?;
            let mut form = AlertRuleForm::from_rule(&existing);
            apply_rule_args(&mut form, args);
            let updated = controller.update_alert_rule(&id, form.to_patch()?).await?;
            println!("Updated alert rule {} ({})", updated.alert_name, updated.id);
            Ok(())
        }
        RuleCommand::Rm { id } => {
            controller.delete_alert_rule(&id).await?;
            println!("Deleted alert rule {id}");
            Ok(())
        }
    }
}

async fn run_ai(controller: &AppController, cmd: AiCommand) -> Result<()> {
    match cmd {
        AiCommand::Show => {
            match controller.ai_settings().await? {
                Some(s) => {
                    println!("provider    : {}", s.provider);
                    println!("model       : {}", s.model);
                    println!("temperature : {}", s.temperature);
                    println!("base_url    : {}", s.base_url.as_deref().unwrap_or("-"));
                    println!("api_key     : {}", s.api_key.as_deref().map(mask_api_key).unwrap_or_else(|| "-".into()));
                }
                None => println!("No AI settings saved; defaults apply."),
            }
            Ok(())
        }
        AiCommand::Save(args) => {
            let mut form = match controller.ai_settings().await? {
                Some(existing) => AiSettingsForm::from_settings(&existing),
                None => AiSettingsForm::default(),
            };
            apply_ai_args(&mut form, args);
            let saved = controller.save_ai_settings(form.to_input()?).await?;
            println!("Saved AI settings ({} / {})", saved.provider, saved.model);
            Ok(())
        }
        AiCommand::Rm => {
            controller.delete_ai_settings().await?;
            println!("Deleted AI settings.");
            Ok(())
        }
    }
}

async fn preview(controller: &AppController, args: PreviewArgs) -> Result<()> {
    let mut preview = controller.config_preview(&args.render_options()).await?;
    match &args.out {
        Some(dir) => {
            for path in preview.write_to(dir).await? {
                println!("wrote {}", path.display());
            }
        }
        None => {
            preview.select(args.file);
            print!("{preview}");
        }
    }
    Ok(())
}

async fn run_api(cmd: ApiCommand) -> Result<()> {
    let mut panel = ApiPanel::default();
    match cmd {
        ApiCommand::Test { url } => {
            if let Some(url) = url {
                panel.prometheus_url = url;
            }
            println!("Connecting to {} ...", panel.prometheus_url);
            let snapshot = panel.test_connection().await?;
            println!("version          : {}", snapshot.version);
            println!("uptime           : {}", snapshot.uptime);
            println!("targets          : {}/{} up", snapshot.targets_active, snapshot.targets_total);
            println!("rules loaded     : {}", snapshot.rules_loaded);
            println!("last config load : {}", snapshot.last_config_time.to_rfc3339());
        }
        ApiCommand::Reload { url } => {
            if let Some(url) = url {
                panel.prometheus_url = url;
            }
            println!("Reloading configuration at {} ...", panel.prometheus_url);
            let at = panel.reload_configuration().await?;
            println!("Reload finished at {}", at.to_rfc3339());
        }
    }
    Ok(())
}

async fn watch(controller: Arc<AppController>, poll_every: Duration) -> Result<()> {
    let mut auth = controller.subscribe_auth();
    let watcher = controller.spawn_session_watcher(poll_every);
    println!("Watching session; press Ctrl-C to stop.");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = auth.changed() => {
                if changed.is_err() || !controller.is_authenticated() {
                    println!("Session ended.");
                    break;
                }
            }
        }
    }
    watcher.abort();
    Ok(())
}
