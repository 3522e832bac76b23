use crate::error::{Result, VectorError};
use async_trait::async_trait;
use chessmate_protocol::{Filter, FilterField, GameSummary, Rating};
use sqlx::postgres::PgPool;
use sqlx::Row;
use std::collections::HashMap;

/// Candidate retrieval against the externally-owned relational schema
/// (spec.md §1 "out of scope: SQL schema and migrations", §4.6 step 1).
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Returns the page of summaries honoring `filters`/`rating`/`limit`/
    /// `offset`, plus the total row count ignoring pagination.
    async fn fetch_games(
        &self,
        filters: &[Filter],
        rating: &Rating,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<GameSummary>, usize)>;
}

/// Production adapter: parameterized queries against a Postgres pool.
/// The games table shape is the caller's contract (spec.md §1); this
/// adapter assumes the column names spec.md §3/§6 name.
pub struct PgGameRepository {
    pool: PgPool,
}

impl PgGameRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GameRepository for PgGameRepository {
    async fn fetch_games(
        &self,
        filters: &[Filter],
        rating: &Rating,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<GameSummary>, usize)> {
        let mut where_clauses = Vec::new();
        let mut args: Vec<String> = Vec::new();

        for filter in filters {
            match filter.field {
                FilterField::Opening => {
                    where_clauses.push(format!("opening_slug = ${}", args.len() + 1));
                    args.push(filter.value.clone());
                }
                FilterField::Theme => {
                    where_clauses.push(format!("${} = ANY(themes)", args.len() + 1));
                    args.push(filter.value.clone());
                }
                FilterField::Phase => {
                    where_clauses.push(format!("${} = ANY(phases)", args.len() + 1));
                    args.push(filter.value.clone());
                }
                FilterField::Result => {
                    where_clauses.push(format!("result = ${}", args.len() + 1));
                    args.push(filter.value.clone());
                }
                FilterField::EcoRange => {
                    if let Some((lo, hi)) = filter.value.split_once('-') {
                        where_clauses.push(format!(
                            "eco_code BETWEEN ${} AND ${}",
                            args.len() + 1,
                            args.len() + 2
                        ));
                        args.push(lo.to_string());
                        args.push(hi.to_string());
                    }
                }
            }
        }
        if let Some(white_min) = rating.white_min {
            where_clauses.push(format!("white_rating >= {white_min}"));
        }
        if let Some(black_min) = rating.black_min {
            where_clauses.push(format!("black_rating >= {black_min}"));
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) AS total FROM games {where_sql}");
        let mut count_query = sqlx::query(&count_sql);
        for arg in &args {
            count_query = count_query.bind(arg);
        }
        let total: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(|err| VectorError::Sql(err.to_string()))?
            .try_get("total")
            .map_err(|err| VectorError::Sql(err.to_string()))?;

        let select_sql = format!(
            "SELECT id, white, black, white_rating, black_rating, event, played_on, result, \
             eco_code, opening_slug, opening_name FROM games {where_sql} \
             ORDER BY GREATEST(white_rating, black_rating) DESC NULLS LAST, played_on DESC NULLS LAST, id \
             LIMIT ${} OFFSET ${}",
            args.len() + 1,
            args.len() + 2
        );
        let mut select_query = sqlx::query(&select_sql);
        for arg in &args {
            select_query = select_query.bind(arg);
        }
        let select_query = select_query.bind(limit as i64).bind(offset as i64);
        let rows = select_query
            .fetch_all(&self.pool)
            .await
            .map_err(|err| VectorError::Sql(err.to_string()))?;

        let summaries = rows
            .into_iter()
            .map(|row| GameSummary {
                id: row.try_get("id").unwrap_or_default(),
                white: row.try_get("white").unwrap_or_default(),
                black: row.try_get("black").unwrap_or_default(),
                white_rating: row.try_get::<Option<i32>, _>("white_rating").ok().flatten().map(|v| v as u32),
                black_rating: row.try_get::<Option<i32>, _>("black_rating").ok().flatten().map(|v| v as u32),
                event: row.try_get("event").ok(),
                played_on: row.try_get("played_on").ok(),
                result: row.try_get("result").ok(),
                eco_code: row.try_get("eco_code").ok(),
                opening_slug: row.try_get("opening_slug").ok(),
                opening_name: row.try_get("opening_name").ok(),
            })
            .collect();

        Ok((summaries, total.max(0) as usize))
    }
}

/// In-memory fake backing deterministic unit tests (spec.md §9
/// "Polymorphism").
#[derive(Default)]
pub struct InMemoryGameRepository {
    games: Vec<GameSummary>,
}

impl InMemoryGameRepository {
    #[must_use]
    pub fn new(games: Vec<GameSummary>) -> Self {
        Self { games }
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn fetch_games(
        &self,
        filters: &[Filter],
        rating: &Rating,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<GameSummary>, usize)> {
        let matches: Vec<&GameSummary> = self
            .games
            .iter()
            .filter(|g| matches_filters(g, filters) && matches_rating(g, rating))
            .collect();
        let total = matches.len();
        let page = matches
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((page, total))
    }
}

fn matches_filters(game: &GameSummary, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter.field {
        FilterField::Opening => game.opening_slug.as_deref() == Some(filter.value.as_str()),
        FilterField::Result => game.result.as_deref() == Some(filter.value.as_str()),
        FilterField::EcoRange => game
            .eco_code
            .as_deref()
            .and_then(|code| eco_in_range(code, &filter.value))
            .unwrap_or(false),
        FilterField::Theme | FilterField::Phase => true,
    })
}

fn eco_in_range(code: &str, range: &str) -> Option<bool> {
    let (lo, hi) = range.split_once('-')?;
    Some(code >= lo && code <= hi)
}

fn matches_rating(game: &GameSummary, rating: &Rating) -> bool {
    if let Some(min) = rating.white_min {
        if game.white_rating.unwrap_or(0) < min {
            return false;
        }
    }
    if let Some(min) = rating.black_min {
        if game.black_rating.unwrap_or(0) < min {
            return false;
        }
    }
    true
}

/// PGN lookup keyed by game id, the other half of spec.md §9's SQL
/// collaborator pair.
#[async_trait]
pub trait PgnFetcher: Send + Sync {
    async fn fetch_pgns(&self, game_ids: &[i64]) -> Result<HashMap<i64, String>>;
}

pub struct PgPgnFetcher {
    pool: PgPool,
}

impl PgPgnFetcher {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PgnFetcher for PgPgnFetcher {
    async fn fetch_pgns(&self, game_ids: &[i64]) -> Result<HashMap<i64, String>> {
        if game_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query("SELECT id, pgn FROM games WHERE id = ANY($1)")
            .bind(game_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| VectorError::Sql(err.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id: i64 = row.try_get("id").ok()?;
                let pgn: String = row.try_get("pgn").ok()?;
                Some((id, pgn))
            })
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryPgnFetcher {
    pgns: HashMap<i64, String>,
}

impl InMemoryPgnFetcher {
    #[must_use]
    pub fn new(pgns: HashMap<i64, String>) -> Self {
        Self { pgns }
    }
}

#[async_trait]
impl PgnFetcher for InMemoryPgnFetcher {
    async fn fetch_pgns(&self, game_ids: &[i64]) -> Result<HashMap<i64, String>> {
        Ok(game_ids
            .iter()
            .filter_map(|id| self.pgns.get(id).map(|pgn| (*id, pgn.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(id: i64, opening_slug: &str, white_rating: u32) -> GameSummary {
        GameSummary {
            id,
            white: "A".into(),
            black: "B".into(),
            white_rating: Some(white_rating),
            black_rating: Some(2000),
            event: None,
            played_on: None,
            result: Some("1-0".into()),
            eco_code: Some("B30".into()),
            opening_slug: Some(opening_slug.into()),
            opening_name: None,
        }
    }

    #[tokio::test]
    async fn filters_by_opening_and_rating() {
        let repo = InMemoryGameRepository::new(vec![
            game(1, "sicilian_defense", 2500),
            game(2, "sicilian_defense", 1800),
            game(3, "french_defense", 2600),
        ]);
        let filters = vec![Filter::new(FilterField::Opening, "sicilian_defense")];
        let rating = Rating {
            white_min: Some(2000),
            black_min: None,
            max_rating_delta: None,
        };
        let (games, total) = repo.fetch_games(&filters, &rating, 10, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(games[0].id, 1);
    }

    #[tokio::test]
    async fn pagination_applies_after_filtering() {
        let repo = InMemoryGameRepository::new(vec![
            game(1, "sicilian_defense", 2000),
            game(2, "sicilian_defense", 2100),
            game(3, "sicilian_defense", 2200),
        ]);
        let (games, total) = repo.fetch_games(&[], &Rating::default(), 2, 1).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(games.len(), 2);
    }
}
