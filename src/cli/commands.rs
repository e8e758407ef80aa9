use crate::app::{AppContext, Result, SubdeckError};
use crate::domain::{Column, Sort, Timeframe};
use crate::store::state::{STORAGE_QUOTA_BYTES, STORAGE_WARNING_THRESHOLD};

fn parse_sort(s: &str) -> Result<Sort> {
    s.parse().map_err(SubdeckError::Config)
}

fn parse_timeframe(s: &str) -> Result<Timeframe> {
    s.parse().map_err(SubdeckError::Config)
}

fn find_column(ctx: &AppContext, id: &str) -> Result<Column> {
    ctx.store
        .get_columns()?
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| SubdeckError::ColumnNotFound(id.to_string()))
}

fn build_column(subreddit: &str, sort: &str, timeframe: Option<&str>) -> Result<Column> {
    let new_timeframe = timeframe.map(parse_timeframe).transpose()?;

    let mut column = Column::new(subreddit.to_string());
    column.set_sort(parse_sort(sort)?);
    if let Some(tf) = new_timeframe {
        if column.sort.takes_timeframe() {
            column.timeframe = Some(tf);
        }
    }
    Ok(column)
}

pub async fn add_column(
    ctx: &AppContext,
    subreddit: &str,
    sort: &str,
    timeframe: Option<&str>,
) -> Result<()> {
    let column = build_column(subreddit, sort, timeframe)?;

    let mut columns = ctx.store.get_columns()?;
    columns.push(column.clone());
    ctx.store.save_columns(&columns)?;

    let mut order = ctx.store.get_column_order()?;
    order.push(column.id.clone());
    ctx.store.save_column_order(&order)?;

    println!("Added column {} for r/{}", column.id, column.subreddit);

    match ctx
        .feeds
        .fetch_subreddit(&column.subreddit, column.sort, column.timeframe, false)
        .await
    {
        Ok(items) => println!("Fetched {} items", items.len()),
        Err(e) => eprintln!("Initial fetch failed: {}", e),
    }

    Ok(())
}

pub fn remove_column(ctx: &AppContext, id: &str) -> Result<()> {
    let mut columns = ctx.store.get_columns()?;
    let before = columns.len();
    columns.retain(|c| c.id != id);
    if columns.len() == before {
        return Err(SubdeckError::ColumnNotFound(id.to_string()));
    }
    ctx.store.save_columns(&columns)?;

    let mut order = ctx.store.get_column_order()?;
    order.retain(|o| o != id);
    ctx.store.save_column_order(&order)?;

    println!("Removed column {}", id);
    Ok(())
}

pub fn list_columns(ctx: &AppContext) -> Result<()> {
    let columns = ctx.store.ordered_columns()?;

    if columns.is_empty() {
        println!("No columns. Add one with `subdeck add <subreddit>`.");
        return Ok(());
    }

    let read = ctx.store.get_read_items()?;
    for column in columns {
        let cached = ctx
            .store
            .get_cached_items(&column.cache_key())?
            .unwrap_or_default();
        let unread = cached.iter().filter(|item| !read.contains(&item.id)).count();
        println!(
            "{}  r/{} [{}] ({} unread)",
            column.id, column.subreddit, column.sort, unread
        );
    }

    if ctx.store.quota_warning_active() {
        eprintln!("Warning: local storage is nearly full");
    }

    Ok(())
}

pub async fn show_column(ctx: &AppContext, id: &str, force: bool) -> Result<()> {
    let column = find_column(ctx, id)?;
    let items = ctx
        .feeds
        .fetch_subreddit(&column.subreddit, column.sort, column.timeframe, force)
        .await?;

    // The column may have been removed while the fetch was in flight;
    // discard the result silently in that case.
    if !ctx.store.get_columns()?.iter().any(|c| c.id == column.id) {
        return Ok(());
    }

    let read = ctx.store.get_read_items()?;
    let unread: Vec<_> = items.iter().filter(|item| !read.contains(&item.id)).collect();

    if unread.is_empty() {
        println!("No unread items");
        return Ok(());
    }

    for item in unread {
        println!("{}  \u{2191}{}  {}", item.id, item.score, item.title);
        println!("    {}", item.url);
    }

    Ok(())
}

pub fn change_sort(ctx: &AppContext, id: &str, sort: &str, timeframe: Option<&str>) -> Result<()> {
    let new_sort = parse_sort(sort)?;
    let new_timeframe = timeframe.map(parse_timeframe).transpose()?;

    let mut columns = ctx.store.get_columns()?;
    {
        let column = columns
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| SubdeckError::ColumnNotFound(id.to_string()))?;
        column.set_sort(new_sort);
        if let Some(tf) = new_timeframe {
            if column.sort.takes_timeframe() {
                column.timeframe = Some(tf);
            }
        }
    }
    ctx.store.save_columns(&columns)?;

    println!("Column {} now sorted by {}", id, new_sort);
    Ok(())
}

pub fn mark_read(ctx: &AppContext, id: &str, item: Option<&str>) -> Result<()> {
    let column = find_column(ctx, id)?;

    match item {
        Some(item_id) => {
            if ctx.store.add_read_item(item_id)? {
                println!("Marked {} read", item_id);
            } else {
                println!("{} was already read", item_id);
            }
        }
        None => {
            let items = ctx
                .store
                .get_cached_items(&column.cache_key())?
                .unwrap_or_default();
            let count = items.len();
            ctx.store
                .add_read_items(items.into_iter().map(|item| item.id))?;
            println!("Marked {} items read in r/{}", count, column.subreddit);
        }
    }

    Ok(())
}

pub fn move_column(ctx: &AppContext, id: &str, position: usize) -> Result<()> {
    // Rebuild from the reconciled view so every live column has a slot.
    let mut order: Vec<String> = ctx
        .store
        .ordered_columns()?
        .into_iter()
        .map(|c| c.id)
        .collect();

    let from = order
        .iter()
        .position(|o| o == id)
        .ok_or_else(|| SubdeckError::ColumnNotFound(id.to_string()))?;
    let column_id = order.remove(from);
    let to = position.min(order.len());
    order.insert(to, column_id);

    ctx.store.save_column_order(&order)?;
    println!("Moved {} to position {}", id, to);
    Ok(())
}

pub async fn refresh(ctx: &AppContext, id: Option<&str>, workers: usize) -> Result<()> {
    match id {
        Some(id) => {
            let column = find_column(ctx, id)?;
            let items = ctx
                .feeds
                .fetch_subreddit(&column.subreddit, column.sort, column.timeframe, true)
                .await?;
            println!("Refreshed r/{}: {} items", column.subreddit, items.len());
        }
        None => {
            let columns = ctx.store.get_columns()?;
            if columns.is_empty() {
                println!("No columns to refresh");
                return Ok(());
            }

            println!("Refreshing {} columns...", columns.len());
            let results = ctx.feeds.clone().refresh_all(columns, workers).await;

            let mut errors = 0;
            for (column_id, result) in results {
                match result {
                    Ok(count) => println!("  {}: {} items", column_id, count),
                    Err(e) => {
                        errors += 1;
                        eprintln!("  {}: {}", column_id, e);
                    }
                }
            }
            println!("Refresh complete, {} errors", errors);
        }
    }

    Ok(())
}

pub fn usage(ctx: &AppContext) -> Result<()> {
    let usage = ctx.store.check_storage_usage()?;
    println!(
        "Storage usage: {:.1}% of {} KiB quota",
        usage * 100.0,
        STORAGE_QUOTA_BYTES / 1024
    );
    if ctx.store.quota_warning_active() {
        println!(
            "Above the {:.0}% warning threshold",
            STORAGE_WARNING_THRESHOLD * 100.0
        );
    }
    Ok(())
}
