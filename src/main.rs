use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{info, warn};

mod app;
mod export;
mod filter;
mod import;
mod merge;
mod model;
mod refresh;
mod storage;
mod store;
mod validator;
mod visits;

use app::App;
use export::{default_export_filename, generate_export_data, ExportKind, ExportSelection, SettingKey};
use filter::{section_view, FilterState};
use import::{check_import_conflicts, execute_import, load_import_file, ConflictPolicy};
use model::{now_millis, Bookmark, BookmarkKind, Catalog, SupportType, VisitRecord};
use refresh::{Debouncer, SmartRefresh, UiSnapshot, REFRESH_DELAY, SEARCH_DEBOUNCE};
use storage::StorageAdapter;
use store::NewBookmark;

#[derive(Parser)]
#[command(name = "bookmark-organizer")]
#[command(about = "Local-first bookmark catalog organizer", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the read-only catalog document
    #[arg(short = 'c', long, global = true, default_value = "bookmarks.json")]
    catalog: PathBuf,

    /// Data directory for personal state (default: ~/.bookmark-organizer)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the merged catalog, optionally filtered
    Show {
        /// Filter by a search term (name, description, url, tags)
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by tag; repeat for OR matching
        #[arg(short, long)]
        tag: Vec<String>,

        /// Show descriptions and tags
        #[arg(short, long)]
        verbose: bool,
    },

    /// Search the catalog and remember the term
    Search {
        term: String,

        /// Additional tag filter; repeat for OR matching
        #[arg(short, long)]
        tag: Vec<String>,

        /// Show descriptions and tags
        #[arg(short, long)]
        verbose: bool,
    },

    /// Add a bookmark to an existing category or one of your own
    Add {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        url: String,

        /// Target category id
        #[arg(short = 'C', long)]
        category: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Comma-separated tags
        #[arg(short, long, default_value = "")]
        tags: String,

        #[arg(long)]
        logo: Option<String>,

        /// Bookmark kind
        #[arg(long, value_enum, default_value_t = BookmarkKind::Web)]
        kind: BookmarkKind,

        /// Support flow opened from the bookmark's help action
        #[arg(long, value_enum, default_value_t = SupportType::Help)]
        support_type: SupportType,
    },

    /// Create a new user-owned category
    AddCategory {
        name: String,

        #[arg(long, default_value = "#6c757d")]
        color: String,
    },

    /// Toggle a favorite by url
    Favorite { url: String },

    /// List favorites
    Favorites,

    /// Record a visit to a bookmark
    Visit { url: String },

    /// Show recently visited bookmarks
    Recent,

    /// Toggle an active tag filter (persisted)
    Tag { name: String },

    /// List every tag with its usage count
    Tags,

    /// Show or set the theme
    Theme { name: Option<String> },

    /// Export user data to a portable JSON document
    Export {
        #[arg(short, long, value_enum, default_value_t = ExportKind::Full)]
        kind: ExportKind,

        /// Output path (default: bookmarks-export-<date>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Selective: user category ids to include (repeatable)
        #[arg(long)]
        category: Vec<String>,

        /// Selective: catalog category ids whose injected bookmarks to include
        #[arg(long)]
        existing: Vec<String>,

        /// Selective: setting groups to include
        #[arg(long, value_enum)]
        setting: Vec<SettingKey>,
    },

    /// Import a previously exported JSON document
    Import {
        file: PathBuf,

        /// Conflict policy applied to every conflicting item
        #[arg(long, value_enum, default_value_t = ConflictPolicy::Skip)]
        conflicts: ConflictPolicy,

        /// Show conflicts without importing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Check catalog and overlay integrity
    Validate {
        /// Show detailed explanations
        #[arg(short, long)]
        detailed: bool,
    },

    /// Interactive mode with debounced search
    Shell,

    /// Show a summary of stored personal data
    Stats,

    /// Delete all personal data
    ClearData {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let storage = match &cli.data_dir {
        Some(dir) => StorageAdapter::new(dir),
        None => StorageAdapter::open_default()?,
    };
    let mut app = App::load(&cli.catalog, storage)?;

    match cli.command {
        Commands::Show { search, tag, verbose } => {
            let filter = filter_for(&app, search, tag);
            println!("{}", render_frame(&RenderFrame::of(&app, filter), verbose));
        }

        Commands::Search { term, tag, verbose } => {
            app.add_search_history(&term)?;
            let filter = filter_for(&app, Some(term), tag);
            println!("{}", render_frame(&RenderFrame::of(&app, filter), verbose));
        }

        Commands::Add { name, url, category, description, tags, logo, kind, support_type } => {
            let new = NewBookmark {
                name,
                url,
                description,
                tags: split_tags(&tags),
                logo,
                kind,
                support_type,
            };
            if let Err(e) = app.store.add_bookmark(new, &category) {
                eprintln!("❌ {e}");
                std::process::exit(1);
            }
            app.store.save(&app.storage)?;
            info!("✅ Bookmark added to '{}'", category);
        }

        Commands::AddCategory { name, color } => {
            let id = app.store.create_category(&name, &color);
            app.store.save(&app.storage)?;
            info!("✅ Created category '{}' ({})", name, id);
        }

        Commands::Favorite { url } => {
            if app.store.find_by_url(&url).is_none() {
                warn!("⚠️  '{}' is not in the catalog; toggling anyway", url);
            }
            if app.toggle_favorite(&url)? {
                info!("⭐ Added to favorites: {}", url);
            } else {
                info!("➖ Removed from favorites: {}", url);
            }
        }

        Commands::Favorites => {
            let favorites = app.favorite_bookmarks();
            if favorites.is_empty() {
                println!("\n(no favorites yet)\n");
            } else {
                println!("\n⭐ Favorites ({})", favorites.len());
                for bookmark in &favorites {
                    println!("  • {} - {}", bookmark.name, bookmark.url);
                }
                println!();
            }
        }

        Commands::Visit { url } => match app.track_visit(&url)? {
            Some(bookmark) => info!("🕒 Tracked visit to '{}'", bookmark.name),
            None => {
                eprintln!("❌ No bookmark with url '{url}'");
                std::process::exit(1);
            }
        },

        Commands::Recent => {
            if app.visits.is_empty() {
                println!("\n(no recent visits)\n");
            } else {
                println!("\n🕒 Recently Visited ({})", app.visits.len());
                for visit in app.visits.entries() {
                    println!("  • {} - {} ({}x)", visit.name, visit.url, visit.count);
                }
                println!();
            }
        }

        Commands::Tag { name } => {
            if app.toggle_tag(&name)? {
                info!("🏷️  Tag filter on: '{}'", name);
            } else {
                info!("➖ Tag filter off: '{}'", name);
            }
        }

        Commands::Tags => {
            let tags = app.all_tags();
            if tags.is_empty() {
                println!("\n(no tags in the catalog)\n");
            } else {
                println!("\n🏷️  Tags ({})", tags.len());
                for (tag, count) in &tags {
                    let active = if app.active_tags.contains(tag) { " [active]" } else { "" };
                    println!("  • {tag} ({count}){active}");
                }
                println!();
            }
        }

        Commands::Theme { name } => match name {
            Some(name) => {
                app.set_theme(&name)?;
                info!("🎨 Theme set to '{}'", name);
            }
            None => println!("Current theme: {}", app.theme),
        },

        Commands::Export { kind, output, category, existing, setting } => {
            let selection = ExportSelection {
                categories: category.into_iter().collect(),
                existing: existing.into_iter().collect(),
                settings: setting.into_iter().collect(),
            };
            if kind == ExportKind::Selective
                && selection.categories.is_empty()
                && selection.existing.is_empty()
                && selection.settings.is_empty()
            {
                eprintln!("❌ Selective export needs at least one --category, --existing or --setting");
                std::process::exit(1);
            }

            let doc = generate_export_data(&app, kind, &selection);
            let path = output.unwrap_or_else(|| PathBuf::from(default_export_filename()));
            let json = serde_json::to_string_pretty(&doc)?;
            std::fs::write(&path, json)
                .with_context(|| format!("could not write export to {path:?}"))?;
            info!(
                "✅ Export completed: {:?} ({} bookmarks, {} categories)",
                path, doc.export_info.total_bookmarks, doc.export_info.total_categories
            );
        }

        Commands::Import { file, conflicts, dry_run } => {
            let doc = match load_import_file(&file) {
                Ok(doc) => doc,
                Err(e) => {
                    eprintln!("❌ Import rejected: {e}");
                    std::process::exit(1);
                }
            };

            let found = check_import_conflicts(&app, &doc);
            if !found.is_empty() {
                println!("\n⚠️  {} conflict(s):", found.len());
                for conflict in &found {
                    println!("  • {conflict}");
                }
                println!();
            }
            if dry_run {
                info!("🏃 Dry run mode - nothing imported");
                return Ok(());
            }

            let summary = execute_import(&mut app, &doc, conflicts)?;
            info!(
                "✅ Import completed: {} bookmarks, {} categories",
                summary.bookmarks_imported, summary.categories_imported
            );
        }

        Commands::Validate { detailed } => {
            let report = validator::check(&app.store);
            println!("{}", report.format(detailed));
        }

        Commands::Shell => {
            run_shell(app).await?;
        }

        Commands::Stats => {
            println!("\n📊 Data Summary");
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("  User Categories:    {}", app.store.overlay().categories.len());
            println!(
                "  Injected Bookmarks: {}",
                app.store
                    .overlay()
                    .bookmarks_in_existing_categories
                    .values()
                    .map(|b| b.len())
                    .sum::<usize>()
            );
            println!("  Favorites:          {}", app.favorites.len());
            println!("  Recent Visits:      {}", app.visits.len());
            println!("  Search History:     {}", app.search_history.len());
            println!("  Active Tags:        {}", app.active_tags.len());
            println!("  Theme:              {}", app.theme);
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        }

        Commands::ClearData { yes } => {
            if !yes {
                print!("This permanently deletes all personal data. Continue? (y/N): ");
                use std::io::{self, Write};
                io::stdout().flush().ok();

                let mut input = String::new();
                io::stdin().read_line(&mut input).ok();

                if !input.trim().eq_ignore_ascii_case("y") {
                    info!("❌ Cancelled");
                    return Ok(());
                }
            }
            app.clear_all_data();
            info!("✅ All personal data cleared");
        }
    }

    Ok(())
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// CLI filters override the persisted ones for a single invocation.
fn filter_for(app: &App, search: Option<String>, tags: Vec<String>) -> FilterState {
    let term = search.unwrap_or_else(|| app.search_term.clone());
    let active = if tags.is_empty() {
        app.active_tags.clone()
    } else {
        tags.into_iter().collect()
    };
    FilterState::new(&term, active)
}

/// Everything one render needs, detached from the live state so a
/// debounced render can run after the input moved on.
struct RenderFrame {
    working: Catalog,
    favorites: Vec<Bookmark>,
    favorite_urls: BTreeSet<String>,
    visits: Vec<VisitRecord>,
    collapsed: BTreeSet<String>,
    filter: FilterState,
}

impl RenderFrame {
    fn of(app: &App, filter: FilterState) -> Self {
        Self {
            working: app.store.working_catalog(),
            favorites: app.favorite_bookmarks(),
            favorite_urls: app.favorites.clone(),
            visits: app.visits.entries().to_vec(),
            collapsed: app.collapsed_categories.clone(),
            filter,
        }
    }
}

fn render_frame(frame: &RenderFrame, verbose: bool) -> String {
    let mut out = String::new();
    let filter = &frame.filter;

    if !frame.favorites.is_empty() {
        let view = section_view(filter, &frame.favorites);
        if !view.hidden {
            out.push_str(&format!("\n⭐ Favorites ({})\n", view.badge));
            for (bookmark, visible) in frame.favorites.iter().zip(&view.visible) {
                if *visible {
                    out.push_str(&format!("  • {} - {}\n", bookmark.name, bookmark.url));
                }
            }
        }
    }

    if !frame.visits.is_empty() {
        let view = section_view(filter, &frame.visits);
        if !view.hidden {
            out.push_str(&format!("\n🕒 Recently Visited ({})\n", view.badge));
            if frame.collapsed.contains("recent-visits") && !filter.is_active() {
                out.push_str("  (collapsed)\n");
            } else {
                for (visit, visible) in frame.visits.iter().zip(&view.visible) {
                    if *visible {
                        out.push_str(&format!(
                            "  • {} - {} ({}x)\n",
                            visit.name, visit.url, visit.count
                        ));
                    }
                }
            }
        }
    }

    for category in &frame.working.categories {
        let view = section_view(filter, &category.bookmarks);
        if view.hidden {
            continue;
        }
        out.push_str(&format!("\n▸ {} ({})\n", category.name, view.badge));
        if frame.collapsed.contains(&category.id) && !filter.is_active() {
            out.push_str("  (collapsed)\n");
            continue;
        }
        for (bookmark, visible) in category.bookmarks.iter().zip(&view.visible) {
            if !*visible {
                continue;
            }
            let star = if frame.favorite_urls.contains(&bookmark.url) { "⭐ " } else { "" };
            out.push_str(&format!("  • {}{} - {}\n", star, bookmark.name, bookmark.url));
            if verbose {
                if !bookmark.description.is_empty() {
                    out.push_str(&format!("      {}\n", bookmark.description));
                }
                if !bookmark.tags.is_empty() {
                    out.push_str(&format!("      tags: {}\n", bookmark.tags.join(", ")));
                }
            }
        }
    }

    if out.is_empty() {
        out.push_str("\n(no bookmarks match)\n");
    }
    out
}

fn snapshot_of(app: &App) -> UiSnapshot {
    UiSnapshot {
        search_term: app.search_term.clone(),
        active_tags: app.active_tags.iter().cloned().collect(),
        collapsed_categories: app.collapsed_categories.iter().cloned().collect(),
        tag_section_expanded: app.tag_section_expanded,
        current_theme: app.theme.clone(),
        timestamp: now_millis(),
    }
}

async fn run_shell(mut app: App) -> Result<()> {
    use tokio::io::{AsyncBufReadExt, BufReader};

    if let Some(snapshot) = refresh::restore_ui_snapshot(&app.storage, now_millis()) {
        info!(
            "🔄 Restored session state from {}s ago",
            (now_millis() - snapshot.timestamp) / 1000
        );
        app.search_term = snapshot.search_term;
        app.active_tags = snapshot.active_tags.into_iter().collect();
        app.collapsed_categories = snapshot.collapsed_categories.into_iter().collect();
        app.tag_section_expanded = snapshot.tag_section_expanded;
        app.theme = snapshot.current_theme;
    }

    println!("Interactive mode. Type to search; /tag <name>, /refresh, /cancel, /clear, /quit");
    println!("{}", render_frame(&RenderFrame::of(&app, app.filter_state()), false));

    let mut debouncer = Debouncer::new(SEARCH_DEBOUNCE);
    let mut smart_refresh = SmartRefresh::new(REFRESH_DELAY);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        match line.as_str() {
            "/quit" | "/q" => break,

            "/cancel" => {
                smart_refresh.cancel(&app.storage);
                info!("❌ Pending refresh cancelled");
            }

            "/refresh" => {
                smart_refresh.schedule(&app.storage, snapshot_of(&app), || {
                    info!("🔄 Refresh due - state reloads on the next command");
                });
                info!("⏳ Refresh scheduled; /cancel to abort");
            }

            "/clear" => {
                app.search_term.clear();
                println!("{}", render_frame(&RenderFrame::of(&app, app.filter_state()), false));
            }

            "" => {
                println!("{}", render_frame(&RenderFrame::of(&app, app.filter_state()), false));
            }

            _ if line.starts_with("/tag ") => {
                let tag = line.trim_start_matches("/tag ").trim();
                if app.toggle_tag(tag)? {
                    info!("🏷️  Tag filter on: '{}'", tag);
                } else {
                    info!("➖ Tag filter off: '{}'", tag);
                }
                println!("{}", render_frame(&RenderFrame::of(&app, app.filter_state()), false));
            }

            term => {
                app.search_term = term.to_string();
                app.add_search_history(term)?;
                let frame = RenderFrame::of(&app, app.filter_state());
                debouncer.schedule(move || println!("{}", render_frame(&frame, false)));
            }
        }
    }

    debouncer.settle().await;
    Ok(())
}
