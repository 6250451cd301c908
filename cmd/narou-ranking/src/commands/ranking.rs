use chrono::NaiveDate;
use clap::Args;
use serde_json::{json, Value};

use domains::{FirstUpdateThreshold, RankingOrder, RankingQuery, RelativeTerm};

use crate::app::App;

#[derive(Debug, Args)]
pub struct RankingArgs {
    /// daily, weekly, monthly, quarter, yearly, overall or weekly_unique_users
    #[arg(long, default_value = "daily")]
    pub order: RankingOrder,

    /// 1-based output page.
    #[arg(long, default_value = "1")]
    pub page: usize,

    #[arg(long)]
    pub keyword: Option<String>,

    #[arg(long)]
    pub exclude: Option<String>,

    /// Match the keyword against titles.
    #[arg(long)]
    pub title: bool,

    /// Match the keyword against synopses.
    #[arg(long)]
    pub story: bool,

    /// Genre ids, comma separated.
    #[arg(long, value_delimiter = ',', conflicts_with = "r18_site")]
    pub genre: Vec<u32>,

    /// Adult site ids, comma separated. Switches to the adult catalogue.
    #[arg(long, value_delimiter = ',')]
    pub r18_site: Vec<u32>,

    #[arg(long)]
    pub min_episodes: Option<u32>,

    #[arg(long)]
    pub max_episodes: Option<u32>,

    /// Only works first published on or after this JST date.
    #[arg(long, group = "first_update")]
    pub since: Option<NaiveDate>,

    /// Only works first published within this many days.
    #[arg(long, group = "first_update")]
    pub within_days: Option<u32>,

    #[arg(long, group = "first_update")]
    pub within_months: Option<u32>,

    #[arg(long, group = "first_update")]
    pub within_years: Option<u32>,

    /// Include one-shots. With no status flag every status is included.
    #[arg(long)]
    pub one_shot: bool,

    #[arg(long)]
    pub ongoing: bool,

    #[arg(long)]
    pub completed: bool,

    /// Skip the title lookup.
    #[arg(long)]
    pub no_enrich: bool,
}

impl RankingArgs {
    fn first_update(&self) -> Option<FirstUpdateThreshold> {
        if let Some(date) = self.since {
            return Some(FirstUpdateThreshold::Absolute(date));
        }
        let term = self
            .within_days
            .map(RelativeTerm::days)
            .or_else(|| self.within_months.map(RelativeTerm::months))
            .or_else(|| self.within_years.map(RelativeTerm::years))?;
        Some(FirstUpdateThreshold::Relative(term))
    }

    pub fn query(&self) -> RankingQuery {
        let mut query = RankingQuery::new(self.order).with_episode_range(self.min_episodes, self.max_episodes);

        if let Some(keyword) = &self.keyword {
            query = query.with_keyword(keyword.clone(), self.title, self.story);
        }
        if let Some(exclude) = &self.exclude {
            query = query.with_exclude_keyword(exclude.clone());
        }
        if !self.r18_site.is_empty() {
            query = query.with_r18_sites(self.r18_site.iter().copied());
        } else if !self.genre.is_empty() {
            query = query.with_genres(self.genre.iter().copied());
        }
        if let Some(threshold) = self.first_update() {
            query = query.with_first_update(threshold);
        }
        if self.one_shot || self.ongoing || self.completed {
            query = query.with_statuses(self.one_shot, self.ongoing, self.completed);
        }
        query
    }
}

pub async fn run(app: &App, args: RankingArgs) -> anyhow::Result<Value> {
    let query = args.query();
    let page = app.ranking_service().fetch_page_detailed(&query, args.page).await?;
    tracing::info!(
        page = page.page,
        records = page.records.len(),
        backend_pages = page.backend_pages_fetched,
        exhausted = page.exhausted,
        "ranking page ready"
    );

    let items = if args.no_enrich {
        super::plain(page.records)
    } else {
        super::enrich(&app.loader(query.domain.site()), page.records).await?
    };

    Ok(json!({
        "order": query.order,
        "page": page.page,
        "exhausted": page.exhausted,
        "backend_pages_fetched": page.backend_pages_fetched,
        "records": items,
    }))
}
