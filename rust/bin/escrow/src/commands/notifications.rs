//! `escrow notifications ...`

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use escrow_client::{Id, Notification};
use escrow_flux::{EventHub, StateValue};
use escrow_notify::{BellDropdown, FeedView, NotificationList, UnreadBadge};

use super::Client;

async fn mount_list(client: &Client) -> NotificationList {
    NotificationList::mount(
        client.backend.clone(),
        client.flux.clone(),
        &client.config.surfaces(),
    )
    .await
}

pub async fn list(page: u32, json: bool, config_path: &Path) -> Result<()> {
    let client = Client::open(config_path)?;
    client.require_session().await?;
    let list = mount_list(&client).await;
    if page > 1 {
        let _ = list.goto_page(page).await;
    }
    client.report_toast();

    let feed = list.feed();
    if json {
        println!("{}", serde_json::to_string_pretty(&feed.items)?);
        return Ok(());
    }
    print_feed(&feed, list.unread_count());
    Ok(())
}

pub async fn read(id: &str, config_path: &Path) -> Result<()> {
    let client = Client::open(config_path)?;
    client.require_session().await?;
    let list = mount_list(&client).await;
    if let Err(e) = list.mark_read(&Id::from(id)).await {
        anyhow::bail!("{}", e);
    }
    println!("Marked {} as read. {} unread.", id, list.unread_count().unwrap_or(0));
    Ok(())
}

pub async fn read_all(config_path: &Path) -> Result<()> {
    let client = Client::open(config_path)?;
    client.require_session().await?;
    let list = mount_list(&client).await;
    if !list.can_mark_all_read() {
        println!("Nothing unread.");
        return Ok(());
    }
    if let Err(e) = list.mark_all_read().await {
        anyhow::bail!("{}", e);
    }
    println!("All notifications marked as read.");
    Ok(())
}

pub async fn delete(id: &str, yes: bool, config_path: &Path) -> Result<()> {
    if !yes {
        eprint!("Delete notification {}? [y/N]: ", id);
        let mut s = String::new();
        std::io::stdin().read_line(&mut s)?;
        if !s.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }
    let client = Client::open(config_path)?;
    client.require_session().await?;
    let list = mount_list(&client).await;
    if let Err(e) = list.delete(&Id::from(id)).await {
        anyhow::bail!("{}", e);
    }
    println!("Deleted {}.", id);
    Ok(())
}

/// Mount the bell and print changes until interrupted.
pub async fn watch(open: bool, config_path: &Path) -> Result<()> {
    let client = Client::open(config_path)?;
    let session = client.require_session().await?;
    println!(
        "Watching notifications for {} every {}s (Ctrl-C to stop).",
        session.identity.name, client.config.poll_interval_secs
    );

    let last_badge: Arc<Mutex<Option<u64>>> = Arc::default();
    let badge_sub = client.flux.subscribe("bell/unread", move |_, value: &StateValue| {
        if let Some(badge) = value.downcast_ref::<UnreadBadge>() {
            let mut last = last_badge.lock().unwrap_or_else(PoisonError::into_inner);
            if *last != Some(badge.count) {
                println!("unread: {}", badge.label().unwrap_or_else(|| "0".into()));
                *last = Some(badge.count);
            }
        }
    });
    let toast_sub = client.flux.subscribe("ui/toast", |_, value: &StateValue| {
        if let Some(toast) = value.downcast_ref::<escrow_notify::Toast>() {
            eprintln!("! {}", toast.message);
        }
    });
    let feed_sub = client.flux.subscribe("bell/feed", |_, value: &StateValue| {
        if let Some(feed) = value.downcast_ref::<FeedView>() {
            if !feed.loading && feed.error.is_none() {
                for n in feed.items.iter().filter(|n| n.is_unread()) {
                    println!("  {}", line(n));
                }
            }
        }
    });

    let bell = BellDropdown::mount(
        client.backend.clone(),
        client.navigator.clone(),
        Arc::new(EventHub::new()),
        client.flux.clone(),
        &client.config.surfaces(),
    );
    if open {
        let _ = bell.open().await;
    }

    tokio::signal::ctrl_c().await?;
    bell.unmount();
    for id in [badge_sub, toast_sub, feed_sub] {
        client.flux.unsubscribe(id);
    }
    println!();
    Ok(())
}

fn line(n: &Notification) -> String {
    let marker = if n.is_unread() { "*" } else { " " };
    let target = n.target().map(|t| t.as_str()).unwrap_or("-");
    format!(
        "{} {:<10} {:<16} {:<40} {}",
        marker,
        n.id.as_str(),
        n.created_at.format("%Y-%m-%d %H:%M").to_string(),
        truncate(&n.title, 40),
        target
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn print_feed(feed: &FeedView, unread: Option<u64>) {
    if feed.items.is_empty() {
        println!("No notifications.");
    } else {
        println!(
            "  {:<10} {:<16} {:<40} {}",
            "ID", "CREATED", "TITLE", "OPENS"
        );
        for n in &feed.items {
            println!("{}", line(n));
        }
    }
    println!();
    println!(
        "page {}/{} · {} total · {} unread",
        feed.meta.current_page,
        feed.meta.last_page,
        feed.meta.total,
        unread.map(|c| c.to_string()).unwrap_or_else(|| "?".into())
    );
}
