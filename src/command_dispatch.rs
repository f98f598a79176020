//! Purpose: Hold top-level CLI command dispatch for `summary-desk`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Form commands go through `SummaryManager`, so validation happens before any request.
//! Invariants: Read-only commands talk to `RemoteClient` directly.

use super::*;

pub(super) fn dispatch_command(command: Command, context: &Context) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "summary-desk", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Serve {
            bind,
            allow_non_loopback,
            max_body_bytes,
            cors_origins,
        } => {
            let config = serve::ServeConfig {
                bind: parse_bind(&bind)?,
                store_uri: context.store.clone(),
                allow_non_loopback,
                max_body_bytes,
                cors_origins,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start async runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
        Command::List => {
            let records = context.client()?.list_all()?;
            emit_json(json!({ "summaries": summaries_json(&records) }));
            Ok(RunOutcome::ok())
        }
        Command::Get { id } => match context.client()?.get_by_id(&id)? {
            Some(record) => {
                emit_json(json!({ "summary": record }));
                Ok(RunOutcome::ok())
            }
            None => Err(Error::new(ErrorKind::NotFound)
                .with_message("summary not found")
                .with_id(id)
                .with_hint("List ids with `summary-desk list`.")),
        },
        Command::Find(args) => {
            let records = find(&context.client()?, args)?;
            emit_json(json!({ "summaries": summaries_json(&records) }));
            Ok(RunOutcome::ok())
        }
        Command::Add(form) => run_manager(context, |manager| {
            Box::pin(async move {
                apply_form(manager, &form);
                manager.add().await
            })
        }),
        Command::Update { id, form } => {
            let Some(existing) = context.client()?.get_by_id(&id)? else {
                return Err(Error::new(ErrorKind::NotFound)
                    .with_message("summary not found")
                    .with_id(id)
                    .with_hint("List ids with `summary-desk list`."));
            };
            run_manager(context, move |manager| {
                Box::pin(async move {
                    manager.load_for_edit(&existing);
                    manager.edit_field(FormField::SummaryId, id.clone());
                    if form.text.is_some() && form.word_count.is_none() {
                        manager.edit_field(FormField::WordCount, "");
                    }
                    apply_form(manager, &FormArgs { id: None, ..form });
                    manager.update().await
                })
            })
        }
        Command::Delete { id } => run_manager(context, move |manager| {
            Box::pin(async move { manager.delete(&id).await })
        }),
        Command::Search { keyword } => run_manager(context, move |manager| {
            Box::pin(async move { manager.search(keyword.as_deref().unwrap_or("")).await })
        }),
    }
}

type ManagerFuture<'a> = std::pin::Pin<Box<dyn std::future::Future<Output = Outcome> + 'a>>;

/// Runs one orchestrated action on a fresh manager and reports its
/// outcome, status, and result list.
fn run_manager<F>(context: &Context, action: F) -> Result<RunOutcome, Error>
where
    F: for<'a> FnOnce(&'a mut SummaryManager<RemoteClient>) -> ManagerFuture<'a>,
{
    let client = context.client()?;
    let runtime = runtime()?;
    let (outcome, report) = runtime.block_on(async {
        let mut manager = SummaryManager::new(client);
        let outcome = action(&mut manager).await;
        (outcome, manager_report(&manager, outcome))
    });
    emit_json(report);
    Ok(RunOutcome::with_code(outcome_exit_code(outcome)))
}

fn apply_form(manager: &mut SummaryManager<RemoteClient>, form: &FormArgs) {
    for (field, value) in form.fields() {
        if let Some(value) = value {
            manager.edit_field(field, value.as_str());
        }
    }
}

fn find(client: &RemoteClient, args: FindArgs) -> Result<Vec<Summary>, Error> {
    let criteria = [
        args.text.is_some(),
        args.timestamp.is_some(),
        args.keyword.is_some(),
        args.min_rating.is_some(),
    ]
    .into_iter()
    .filter(|given| *given)
    .count();
    if criteria != 1 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("find takes exactly one criterion")
            .with_hint("Use one of --text, --timestamp, --keyword, or --min-rating with --max-rating."));
    }
    match (args.text, args.timestamp, args.keyword, args.min_rating, args.max_rating) {
        (Some(text), ..) => client.get_by_text_fragment(&text),
        (_, Some(ts), ..) => client.get_by_timestamp(&ts),
        (_, _, Some(keyword), ..) => client.get_by_keyword(&keyword),
        (_, _, _, Some(min), Some(max)) => client.get_by_rating_range(min, max),
        _ => Err(Error::new(ErrorKind::Usage)
            .with_message("--min-rating and --max-rating go together")),
    }
}
