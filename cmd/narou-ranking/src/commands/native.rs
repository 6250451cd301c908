use chrono::{NaiveDate, Utc};
use clap::Args;
use serde_json::{json, Value};

use domains::time::jst_date;
use domains::{RankingOrder, Site};
use services::native::publication_date;

use crate::app::App;

#[derive(Debug, Args)]
pub struct NativeArgs {
    /// daily, weekly, monthly or quarter
    #[arg(long, default_value = "daily")]
    pub order: RankingOrder,

    /// Ranking date in JST. Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,

    #[arg(long, default_value = "1")]
    pub page: usize,

    #[arg(long)]
    pub no_enrich: bool,
}

pub async fn run(app: &App, args: NativeArgs) -> anyhow::Result<Value> {
    let date = args.date.unwrap_or_else(|| jst_date(Utc::now()));
    let records = app.native_service().fetch(args.order, date, args.page).await?;

    let items = if args.no_enrich {
        super::plain(records)
    } else {
        super::enrich(&app.loader(Site::General), records).await?
    };

    let published = args.order.native_period().map(|period| publication_date(period, date));
    Ok(json!({
        "order": args.order,
        "date": published,
        "page": args.page,
        "records": items,
    }))
}
