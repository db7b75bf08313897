use std::fmt::Write as _;
use std::future::Future;
use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Args;

use crate::app::App;
use crate::components::note_form::validate_note;
use crate::components::note_list::{format_timestamp, preview};
use crate::config::AppConfig;
use crate::model::{ListParams, Note, NotePage};
use crate::service::NoteApi;

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Page to fetch, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// Only notes matching this text
    #[arg(long, default_value = "")]
    pub search: String,
    /// Notes per page (defaults to list.per_page from the config)
    #[arg(long)]
    pub per_page: Option<u32>,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Title for the note (3 to 50 characters)
    #[arg()]
    pub title: String,
    /// Note body. If omitted, reads from stdin when it is not a terminal.
    #[arg(long)]
    pub content: Option<String>,
    /// One of Todo, Work, Personal, Meeting, Shopping
    #[arg(long, default_value = "Todo")]
    pub tag: String,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Note identifier as shown by `list`
    #[arg()]
    pub id: String,
}

pub fn run_tui(config: Arc<AppConfig>, api: Arc<dyn NoteApi>) -> Result<()> {
    let mut app = App::new(config, api)?;
    app.run()
}

pub fn list_notes(config: &AppConfig, api: &dyn NoteApi, args: &ListArgs) -> Result<()> {
    let output = run_list(config, api, args)?;
    print!("{output}");
    Ok(())
}

fn run_list(config: &AppConfig, api: &dyn NoteApi, args: &ListArgs) -> Result<String> {
    let params = ListParams::new(
        args.page,
        args.per_page.unwrap_or(config.list.per_page),
        args.search.trim(),
    );
    let page = block_on(api.list(&params))?
        .with_context(|| format!("listing notes (page {})", params.page))?;
    Ok(format_page(&page, &params))
}

fn format_page(page: &NotePage, params: &ListParams) -> String {
    if page.is_empty() {
        return "No notes found\n".to_string();
    }
    let mut out = String::new();
    for note in &page.notes {
        let _ = writeln!(&mut out, "{}  {}  [{}]", note.id, note.title, note.tag);
        let _ = writeln!(
            &mut out,
            "    updated {}",
            format_timestamp(note.updated_at.as_deref())
        );
        let snippet = preview(note, 2);
        if !snippet.is_empty() {
            let _ = writeln!(&mut out, "    {snippet}");
        }
        out.push('\n');
    }
    if page.total_pages > 1 {
        let _ = writeln!(&mut out, "page {} of {}", params.page, page.total_pages);
    }
    out
}

pub fn create_note(api: &dyn NoteApi, args: CreateArgs) -> Result<()> {
    let content = match args.content {
        Some(content) => content,
        None => read_stdin()?.unwrap_or_default(),
    };
    let note = run_create(api, args.title.trim(), content.trim_end(), &args.tag)?;
    println!("Created note {} \"{}\"", note.id, note.title);
    Ok(())
}

fn run_create(api: &dyn NoteApi, title: &str, content: &str, tag: &str) -> Result<Note> {
    let draft = validate_note(title, content, tag)
        .map_err(|errors| anyhow!("note failed validation: {errors}"))?;
    let created = block_on(api.create(&draft))?.context("creating note")?;
    tracing::info!(id = %created.id, "note created");
    Ok(created)
}

pub fn delete_note(api: &dyn NoteApi, args: &DeleteArgs) -> Result<()> {
    let removed = block_on(api.delete(&args.id))?
        .with_context(|| format!("deleting note {}", args.id))?;
    println!("Deleted note {} \"{}\"", removed.id, removed.title);
    Ok(())
}

fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    Ok(runtime.block_on(future))
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("reading note content from stdin")?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::model::{NewNote, NoteTag};
    use crate::service::{ServiceError, ServiceResult};

    type TestResult<T = ()> = Result<T>;

    #[derive(Default)]
    struct CountingApi {
        creates: AtomicUsize,
    }

    fn note(id: &str, title: &str, content: &str) -> Note {
        Note {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            tag: NoteTag::Work,
            created_at: None,
            updated_at: Some("2024-05-01T09:30:00Z".into()),
        }
    }

    #[async_trait]
    impl NoteApi for CountingApi {
        async fn list(&self, params: &ListParams) -> ServiceResult<NotePage> {
            if params.search == "nothing" {
                return Ok(NotePage {
                    notes: Vec::new(),
                    total_pages: 0,
                });
            }
            Ok(NotePage {
                notes: vec![note("abc", "Sprint review", "demo\nretro")],
                total_pages: 3,
            })
        }

        async fn create(&self, draft: &NewNote) -> ServiceResult<Note> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(note("new1", &draft.title, &draft.content))
        }

        async fn delete(&self, id: &str) -> ServiceResult<Note> {
            Err(ServiceError::NotFound { id: id.to_string() })
        }
    }

    #[test]
    fn list_prints_notes_and_page_position() -> TestResult {
        let args = ListArgs {
            page: 2,
            search: "sprint".into(),
            per_page: None,
        };
        let output = run_list(&AppConfig::default(), &CountingApi::default(), &args)?;
        assert!(output.contains("abc  Sprint review  [Work]"));
        assert!(output.contains("updated 2024-05-01 09:30"));
        assert!(output.contains("demo retro"));
        assert!(output.contains("page 2 of 3"));
        Ok(())
    }

    #[test]
    fn list_reports_empty_result() -> TestResult {
        let args = ListArgs {
            page: 1,
            search: "nothing".into(),
            per_page: Some(5),
        };
        let output = run_list(&AppConfig::default(), &CountingApi::default(), &args)?;
        assert_eq!(output, "No notes found\n");
        Ok(())
    }

    #[test]
    fn invalid_draft_never_reaches_api() {
        let api = CountingApi::default();
        let err = run_create(&api, "ab", "", "Todo").unwrap_err();
        assert!(err.to_string().contains("Minimum 3 characters"));
        let err = run_create(&api, "Groceries", "", "Errands").unwrap_err();
        assert!(err.to_string().contains("Must be one of"));
        assert_eq!(api.creates.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn valid_draft_is_created_once() -> TestResult {
        let api = CountingApi::default();
        let created = run_create(&api, "Groceries", "milk", "Shopping")?;
        assert_eq!(created.title, "Groceries");
        assert_eq!(api.creates.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn delete_failure_keeps_service_error_in_chain() {
        let args = DeleteArgs { id: "zzz".into() };
        let err = delete_note(&CountingApi::default(), &args).unwrap_err();
        assert!(err.to_string().contains("deleting note zzz"));
        assert!(err
            .chain()
            .any(|cause| cause.downcast_ref::<ServiceError>().is_some()));
    }
}
