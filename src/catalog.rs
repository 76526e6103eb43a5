use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr,
    sea_query::{Expr, LikeExpr, OnConflict, Query},
};

use crate::{
    entities::{actor, category, genre, movie, movie_actor, movie_genre, rating, review, star},
    error::{AppError, AppResult},
    filter::{Combinator, MovieFilter},
    forms::{NewReview, Vote},
    models::{
        ActorDetail, LATEST_MOVIES, MovieDetail, MovieSummary, Page, PageNumber, ReviewNode,
        Sidebar,
    },
};

/// Read and write access to the movie catalogue.
#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[cfg(test)]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn list_published(
        &self,
        per_page: u64,
        page: PageNumber,
    ) -> AppResult<Page<movie::Model>> {
        self.paginate(published(), per_page, page).await
    }

    /// Facet filter over published movies, combining facets per
    /// [`MovieFilter::combinator`].
    pub async fn filter_movies(
        &self,
        filter: &MovieFilter,
        per_page: u64,
        page: PageNumber,
    ) -> AppResult<Page<movie::Model>> {
        let Some(cond) = facet_condition(filter, filter.combinator()) else {
            return match page.resolve(1) {
                Some(_) => Ok(Page::empty()),
                None => Err(AppError::NotFound),
            };
        };
        self.paginate(published().filter(cond), per_page, page).await
    }

    /// Unpaginated facet filter that always ORs the facets.
    pub async fn filter_summaries(&self, filter: &MovieFilter) -> AppResult<Vec<MovieSummary>> {
        let Some(cond) = facet_condition(filter, Combinator::Any) else {
            return Ok(Vec::new());
        };
        let movies = published().filter(cond).all(&self.db).await?;
        Ok(movies.into_iter().map(MovieSummary::from).collect())
    }

    /// Case-insensitive title search. `q` is matched literally, so `%` and
    /// `_` are not wildcards. Drafts are included.
    pub async fn search(
        &self,
        q: &str,
        per_page: u64,
        page: PageNumber,
    ) -> AppResult<Page<movie::Model>> {
        let pattern = format!("%{}%", escape_like(q));
        let select = movie::Entity::find()
            .filter(
                Expr::col((movie::Entity, movie::Column::Title))
                    .like(LikeExpr::new(pattern).escape(LIKE_ESCAPE)),
            )
            .order_by_asc(movie::Column::Id);
        self.paginate(select, per_page, page).await
    }

    pub async fn published_by_slug(&self, slug: &str) -> AppResult<Option<movie::Model>> {
        Ok(published().filter(movie::Column::Url.eq(slug)).one(&self.db).await?)
    }

    pub async fn movie_by_id(&self, id: i32) -> AppResult<Option<movie::Model>> {
        Ok(movie::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn movie_detail(
        &self,
        movie: movie::Model,
        client: Option<&str>,
    ) -> AppResult<MovieDetail> {
        let category = movie.find_related(category::Entity).one(&self.db).await?;
        let genres = movie
            .find_related(genre::Entity)
            .order_by_asc(genre::Column::Name)
            .all(&self.db)
            .await?;
        let directors = self.credits(movie.id, movie_actor::Role::Director).await?;
        let actors = self.credits(movie.id, movie_actor::Role::Actor).await?;
        let reviews = movie
            .find_related(review::Entity)
            .order_by_asc(review::Column::Id)
            .all(&self.db)
            .await?;
        let stars = self.stars().await?;
        let user_stars = match client {
            Some(ip) => self.user_star(ip, movie.id).await?.map(|v| v.to_string()),
            None => None,
        };

        Ok(MovieDetail {
            movie,
            category,
            genres,
            directors,
            actors,
            reviews: review_tree(reviews),
            stars,
            user_stars,
        })
    }

    async fn credits(&self, movie_id: i32, role: movie_actor::Role) -> AppResult<Vec<actor::Model>> {
        Ok(actor::Entity::find()
            .inner_join(movie_actor::Entity)
            .filter(movie_actor::Column::MovieId.eq(movie_id))
            .filter(movie_actor::Column::Role.eq(role))
            .order_by_asc(actor::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn stars(&self) -> AppResult<Vec<star::Model>> {
        Ok(star::Entity::find().order_by_asc(star::Column::Value).all(&self.db).await?)
    }

    /// Star value the client gave this movie, if any.
    pub async fn user_star(&self, ip: &str, movie_id: i32) -> AppResult<Option<i16>> {
        let found = rating::Entity::find()
            .filter(rating::Column::Ip.eq(ip))
            .filter(rating::Column::MovieId.eq(movie_id))
            .find_also_related(star::Entity)
            .one(&self.db)
            .await?;
        Ok(found.and_then(|(_, star)| star).map(|s| s.value))
    }

    /// Records the client's vote, replacing any earlier one for the movie,
    /// in a single statement. Returns `false` without writing when the movie
    /// or star does not exist; the foreign keys reject those rows.
    pub async fn upsert_rating(&self, ip: &str, vote: Vote) -> AppResult<bool> {
        let model = rating::ActiveModel {
            id: Default::default(),
            ip: Set(ip.to_string()),
            star_id: Set(vote.star_id),
            movie_id: Set(vote.movie_id),
        };

        let written = rating::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([rating::Column::Ip, rating::Column::MovieId])
                    .update_column(rating::Column::StarId)
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await;

        match written {
            Ok(_) => Ok(true),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) => {
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn add_review(&self, movie_id: i32, new: NewReview) -> AppResult<review::Model> {
        let model = review::ActiveModel {
            id: Default::default(),
            email: Set(new.email),
            text: Set(new.text),
            parent_id: Set(new.parent_id),
            movie_id: Set(movie_id),
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn actor_by_name(&self, name: &str) -> AppResult<Option<ActorDetail>> {
        let Some(actor) = actor::Entity::find()
            .filter(actor::Column::Name.eq(name))
            .order_by_asc(actor::Column::Id)
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let movies = published()
            .inner_join(movie_actor::Entity)
            .filter(movie_actor::Column::ActorId.eq(actor.id))
            .distinct()
            .all(&self.db)
            .await?;

        Ok(Some(ActorDetail { actor, movies }))
    }

    /// Reference data shown next to every page.
    pub async fn sidebar(&self) -> AppResult<Sidebar> {
        let genres = genre::Entity::find().order_by_asc(genre::Column::Name).all(&self.db).await?;
        let years = movie::Entity::find()
            .select_only()
            .column(movie::Column::Year)
            .filter(movie::Column::Draft.eq(false))
            .distinct()
            .order_by_asc(movie::Column::Year)
            .into_tuple::<i16>()
            .all(&self.db)
            .await?;
        let categories =
            category::Entity::find().order_by_asc(category::Column::Id).all(&self.db).await?;
        let latest = published().limit(LATEST_MOVIES).all(&self.db).await?;

        Ok(Sidebar { genres, years, categories, latest })
    }

    async fn paginate(
        &self,
        select: Select<movie::Entity>,
        per_page: u64,
        page: PageNumber,
    ) -> AppResult<Page<movie::Model>> {
        let paginator = select.paginate(&self.db, per_page.max(1));
        let num_pages = paginator.num_pages().await?.max(1);
        let number = page.resolve(num_pages).ok_or(AppError::NotFound)?;
        let items = paginator.fetch_page(number - 1).await?;
        Ok(Page { items, number, num_pages })
    }
}

const LIKE_ESCAPE: char = '\\';

/// Escapes the LIKE metacharacters in `raw` for use with [`LIKE_ESCAPE`].
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

fn published() -> Select<movie::Entity> {
    movie::Entity::find().filter(movie::Column::Draft.eq(false)).order_by_asc(movie::Column::Id)
}

/// `None` when no facet carries a value, i.e. nothing can match.
fn facet_condition(filter: &MovieFilter, combinator: Combinator) -> Option<Condition> {
    let mut facets = match combinator {
        Combinator::Any => Condition::any(),
        Combinator::All => Condition::all(),
    };
    let mut constrained = false;

    if !filter.years.is_empty() {
        facets = facets.add(movie::Column::Year.is_in(filter.years.iter().copied()));
        constrained = true;
    }
    if !filter.genres.is_empty() {
        // Membership through a subquery, so a movie with several matching
        // genres still yields a single row.
        facets = facets.add(
            movie::Column::Id.in_subquery(
                Query::select()
                    .column(movie_genre::Column::MovieId)
                    .from(movie_genre::Entity)
                    .and_where(movie_genre::Column::GenreId.is_in(filter.genres.iter().copied()))
                    .to_owned(),
            ),
        );
        constrained = true;
    }

    constrained.then_some(facets)
}

/// Nests replies under their parents. Replies whose parent is not among
/// `reviews` are left out of the tree.
fn review_tree(reviews: Vec<review::Model>) -> Vec<ReviewNode> {
    let mut children: HashMap<Option<i32>, Vec<review::Model>> = HashMap::new();
    for r in reviews {
        children.entry(r.parent_id).or_default().push(r);
    }

    fn build(
        parent: Option<i32>,
        children: &mut HashMap<Option<i32>, Vec<review::Model>>,
    ) -> Vec<ReviewNode> {
        let Some(level) = children.remove(&parent) else {
            return Vec::new();
        };
        level
            .into_iter()
            .map(|review| {
                let replies = build(Some(review.id), children);
                ReviewNode { review, replies }
            })
            .collect()
    }

    build(None, &mut children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, entities::movie_actor::Role, testing::*};

    fn titles(movies: &[movie::Model]) -> Vec<&str> {
        movies.iter().map(|m| m.title.as_str()).collect()
    }

    async fn all_filtered(catalog: &Catalog, filter: &MovieFilter) -> Vec<movie::Model> {
        catalog.filter_movies(filter, 100, PageNumber::FIRST).await.unwrap().items
    }

    #[tokio::test]
    async fn and_branch_needs_both_facets() {
        let db = db::memory().await;
        let action = genre(&db, "Action").await;
        let drama = genre(&db, "Drama").await;
        let a = movie(&db, "A", 2020, false).await;
        let b = movie(&db, "B", 2021, false).await;
        tag(&db, &a, &action).await;
        tag(&db, &b, &drama).await;
        let catalog = Catalog::new(db);

        let both = MovieFilter { years: vec![2020], genres: vec![drama.id] };
        assert!(all_filtered(&catalog, &both).await.is_empty());

        let only_genre = MovieFilter { years: vec![], genres: vec![drama.id] };
        assert_eq!(titles(&all_filtered(&catalog, &only_genre).await), ["B"]);
    }

    #[tokio::test]
    async fn or_branch_matches_either_facet_and_skips_drafts() {
        let db = db::memory().await;
        let drama = genre(&db, "Drama").await;
        movie(&db, "A", 2020, false).await;
        let b = movie(&db, "B", 2021, false).await;
        let hidden = movie(&db, "Hidden", 2020, true).await;
        tag(&db, &b, &drama).await;
        tag(&db, &hidden, &drama).await;
        let catalog = Catalog::new(db);

        let years = MovieFilter { years: vec![2020], genres: vec![] };
        assert_eq!(titles(&all_filtered(&catalog, &years).await), ["A"]);

        let genres = MovieFilter { years: vec![], genres: vec![drama.id] };
        assert_eq!(titles(&all_filtered(&catalog, &genres).await), ["B"]);

        let nothing = MovieFilter::default();
        assert!(all_filtered(&catalog, &nothing).await.is_empty());
    }

    #[tokio::test]
    async fn several_matching_genres_yield_one_row() {
        let db = db::memory().await;
        let action = genre(&db, "Action").await;
        let scifi = genre(&db, "Sci-Fi").await;
        let m = movie(&db, "The Matrix", 1999, false).await;
        tag(&db, &m, &action).await;
        tag(&db, &m, &scifi).await;
        let catalog = Catalog::new(db);

        let both = MovieFilter { years: vec![1999], genres: vec![action.id, scifi.id] };
        let page = catalog.filter_movies(&both, 2, PageNumber::FIRST).await.unwrap();
        assert_eq!(titles(&page.items), ["The Matrix"]);
        assert_eq!(page.num_pages, 1);

        let json = catalog
            .filter_summaries(&MovieFilter { years: vec![], genres: vec![action.id, scifi.id] })
            .await
            .unwrap();
        assert_eq!(json.len(), 1);
        assert_eq!(json[0].url, "the-matrix");
    }

    #[tokio::test]
    async fn json_filter_ignores_and_rule() {
        let db = db::memory().await;
        let drama = genre(&db, "Drama").await;
        movie(&db, "A", 2020, false).await;
        let b = movie(&db, "B", 2021, false).await;
        tag(&db, &b, &drama).await;
        let catalog = Catalog::new(db);

        let filter = MovieFilter { years: vec![2020], genres: vec![drama.id] };
        let found = catalog.filter_summaries(&filter).await.unwrap();
        let names: Vec<_> = found.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[tokio::test]
    async fn filter_paginates_by_page_size() {
        let db = db::memory().await;
        for (title, year) in [("One", 2001), ("Two", 2001), ("Three", 2001)] {
            movie(&db, title, year, false).await;
        }
        let catalog = Catalog::new(db);
        let filter = MovieFilter { years: vec![2001], genres: vec![] };

        let first = catalog.filter_movies(&filter, 2, PageNumber::FIRST).await.unwrap();
        assert_eq!(titles(&first.items), ["One", "Two"]);
        assert!(first.has_next());

        let second = catalog.filter_movies(&filter, 2, PageNumber::Nth(2)).await.unwrap();
        assert_eq!(titles(&second.items), ["Three"]);

        assert!(matches!(catalog.filter_movies(&filter, 2, PageNumber::Nth(3)).await, Err(AppError::NotFound)));

        let last = catalog.filter_movies(&filter, 2, PageNumber::Last).await.unwrap();
        assert_eq!(last.number, 2);
        assert_eq!(titles(&last.items), ["Three"]);

        let nothing = MovieFilter::default();
        let empty = catalog.filter_movies(&nothing, 2, PageNumber::Last).await.unwrap();
        assert!(empty.items.is_empty());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_includes_drafts() {
        let db = db::memory().await;
        movie(&db, "The Matrix", 1999, false).await;
        movie(&db, "Se7en", 1995, false).await;
        movie(&db, "Matrix Draft Cut", 2003, true).await;
        let catalog = Catalog::new(db);

        let page = catalog.search("mat", 3, PageNumber::FIRST).await.unwrap();
        assert_eq!(titles(&page.items), ["The Matrix", "Matrix Draft Cut"]);
    }

    #[tokio::test]
    async fn search_treats_like_metacharacters_literally() {
        let db = db::memory().await;
        movie(&db, "The Matrix", 1999, false).await;
        movie(&db, "100% Wolf", 2020, false).await;
        movie(&db, "Back\\Slash", 2001, false).await;
        let catalog = Catalog::new(db);

        let percent = catalog.search("%", 10, PageNumber::FIRST).await.unwrap();
        assert_eq!(titles(&percent.items), ["100% Wolf"]);

        let underscore = catalog.search("_", 10, PageNumber::FIRST).await.unwrap();
        assert!(underscore.items.is_empty());

        let backslash = catalog.search("k\\s", 10, PageNumber::FIRST).await.unwrap();
        assert_eq!(titles(&backslash.items), ["Back\\Slash"]);

        let everything = catalog.search("", 10, PageNumber::FIRST).await.unwrap();
        assert_eq!(everything.items.len(), 3);
    }

    #[test]
    fn like_escaping() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[tokio::test]
    async fn second_vote_replaces_first() {
        let db = db::memory().await;
        let m = movie(&db, "Heat", 1995, false).await;
        let catalog = Catalog::new(db);

        assert!(catalog.upsert_rating("1.2.3.4", Vote { movie_id: m.id, star_id: 2 }).await.unwrap());
        assert!(catalog.upsert_rating("1.2.3.4", Vote { movie_id: m.id, star_id: 5 }).await.unwrap());
        assert!(catalog.upsert_rating("5.6.7.8", Vote { movie_id: m.id, star_id: 1 }).await.unwrap());

        let rows = rating::Entity::find()
            .filter(rating::Column::Ip.eq("1.2.3.4"))
            .all(catalog.db())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].star_id, 5);
        assert_eq!(catalog.user_star("1.2.3.4", m.id).await.unwrap(), Some(5));
        assert_eq!(rating::Entity::find().count(catalog.db()).await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn simultaneous_votes_keep_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("votes.db").display());
        let db = db::connect_and_migrate(&url, 4).await.unwrap();
        let m = movie(&db, "Heat", 1995, false).await;
        let catalog = Catalog::new(db);

        let vote = |star_id| {
            let catalog = catalog.clone();
            let movie_id = m.id;
            async move { catalog.upsert_rating("1.2.3.4", Vote { movie_id, star_id }).await }
        };
        let (a, b, c, d, e) = tokio::join!(
            tokio::spawn(vote(1)),
            tokio::spawn(vote(2)),
            tokio::spawn(vote(3)),
            tokio::spawn(vote(4)),
            tokio::spawn(vote(5)),
        );
        for saved in [a, b, c, d, e] {
            assert!(saved.unwrap().unwrap());
        }

        let rows = rating::Entity::find().all(catalog.db()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!((1..=5).contains(&rows[0].star_id));
    }

    #[tokio::test]
    async fn unknown_star_or_movie_is_not_stored() {
        let db = db::memory().await;
        let m = movie(&db, "Heat", 1995, false).await;
        let catalog = Catalog::new(db);

        assert!(!catalog.upsert_rating("1.2.3.4", Vote { movie_id: m.id, star_id: 9 }).await.unwrap());
        assert!(!catalog.upsert_rating("1.2.3.4", Vote { movie_id: 404, star_id: 3 }).await.unwrap());
        assert_eq!(rating::Entity::find().count(catalog.db()).await.unwrap(), 0);

        // A bad star on the update path leaves the earlier vote in place.
        assert!(catalog.upsert_rating("1.2.3.4", Vote { movie_id: m.id, star_id: 3 }).await.unwrap());
        assert!(!catalog.upsert_rating("1.2.3.4", Vote { movie_id: m.id, star_id: 9 }).await.unwrap());
        assert_eq!(catalog.user_star("1.2.3.4", m.id).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn detail_collects_credits_reviews_and_vote() {
        let db = db::memory().await;
        let m = movie(&db, "Heat", 1995, false).await;
        let mann = actor(&db, "Michael Mann").await;
        let pacino = actor(&db, "Al Pacino").await;
        credit(&db, &m, &mann, Role::Director).await;
        credit(&db, &m, &pacino, Role::Actor).await;
        let catalog = Catalog::new(db);

        let first = catalog
            .add_review(m.id, NewReview { text: "Great".into(), email: "a@b.io".into(), parent_id: None })
            .await
            .unwrap();
        catalog
            .add_review(
                m.id,
                NewReview { text: "Agreed".into(), email: "c@d.io".into(), parent_id: Some(first.id) },
            )
            .await
            .unwrap();
        catalog.upsert_rating("9.9.9.9", Vote { movie_id: m.id, star_id: 4 }).await.unwrap();

        let detail = catalog.movie_detail(m.clone(), Some("9.9.9.9")).await.unwrap();
        assert_eq!(detail.directors[0].name, "Michael Mann");
        assert_eq!(detail.actors[0].name, "Al Pacino");
        assert_eq!(detail.reviews.len(), 1);
        assert_eq!(detail.reviews[0].replies[0].review.text, "Agreed");
        assert_eq!(detail.user_stars.as_deref(), Some("4"));
        assert_eq!(detail.stars.len(), 5);

        let anonymous = catalog.movie_detail(m, Some("0.0.0.0")).await.unwrap();
        assert_eq!(anonymous.user_stars, None);
    }

    #[tokio::test]
    async fn dangling_parent_is_stored_verbatim() {
        let db = db::memory().await;
        let m = movie(&db, "Heat", 1995, false).await;
        let catalog = Catalog::new(db);

        let saved = catalog
            .add_review(m.id, NewReview { text: "?".into(), email: "a@b.io".into(), parent_id: Some(777) })
            .await
            .unwrap();
        assert_eq!(saved.parent_id, Some(777));

        let detail = catalog.movie_detail(m, None).await.unwrap();
        assert!(detail.reviews.is_empty());
    }

    #[tokio::test]
    async fn sidebar_lists_published_years_once() {
        let db = db::memory().await;
        genre(&db, "Drama").await;
        movie(&db, "A", 2020, false).await;
        movie(&db, "B", 2020, false).await;
        movie(&db, "C", 1999, false).await;
        movie(&db, "D", 2030, true).await;
        let catalog = Catalog::new(db);

        let sidebar = catalog.sidebar().await.unwrap();
        assert_eq!(sidebar.years, vec![1999, 2020]);
        assert_eq!(sidebar.genres.len(), 1);
        assert_eq!(titles(&sidebar.latest), ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn actor_page_lists_published_movies_once() {
        let db = db::memory().await;
        let eastwood = actor(&db, "Clint Eastwood").await;
        let unforgiven = movie(&db, "Unforgiven", 1992, false).await;
        let draft = movie(&db, "Unreleased", 2031, true).await;
        credit(&db, &unforgiven, &eastwood, Role::Actor).await;
        credit(&db, &unforgiven, &eastwood, Role::Director).await;
        credit(&db, &draft, &eastwood, Role::Actor).await;
        let catalog = Catalog::new(db);

        let detail = catalog.actor_by_name("Clint Eastwood").await.unwrap().unwrap();
        assert_eq!(titles(&detail.movies), ["Unforgiven"]);
        assert!(catalog.actor_by_name("Nobody").await.unwrap().is_none());
    }
}
