//! Fixture builders for tests that need rows in the catalogue.

use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::entities::{actor, genre, movie, movie_actor, movie_genre};

pub fn slug(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

pub async fn movie(db: &DatabaseConnection, title: &str, year: i16, draft: bool) -> movie::Model {
    movie::ActiveModel {
        id: Default::default(),
        title: Set(title.to_string()),
        tagline: Set(format!("{title} tagline")),
        description: Set(String::new()),
        poster: Set(format!("posters/{}.jpg", slug(title))),
        year: Set(year),
        country: Set("USA".to_string()),
        category_id: Set(None),
        url: Set(slug(title)),
        draft: Set(draft),
    }
    .insert(db)
    .await
    .expect("insert movie")
}

pub async fn genre(db: &DatabaseConnection, name: &str) -> genre::Model {
    genre::ActiveModel {
        id: Default::default(),
        name: Set(name.to_string()),
        description: Set(String::new()),
        url: Set(slug(name)),
    }
    .insert(db)
    .await
    .expect("insert genre")
}

pub async fn actor(db: &DatabaseConnection, name: &str) -> actor::Model {
    actor::ActiveModel {
        id: Default::default(),
        name: Set(name.to_string()),
        age: Set(60),
        description: Set(format!("{name} bio")),
        image: Set(format!("actors/{}.jpg", slug(name))),
    }
    .insert(db)
    .await
    .expect("insert actor")
}

pub async fn tag(db: &DatabaseConnection, movie: &movie::Model, genre: &genre::Model) {
    movie_genre::ActiveModel { movie_id: Set(movie.id), genre_id: Set(genre.id) }
        .insert(db)
        .await
        .expect("link genre");
}

pub async fn credit(
    db: &DatabaseConnection,
    movie: &movie::Model,
    actor: &actor::Model,
    role: movie_actor::Role,
) {
    movie_actor::ActiveModel { movie_id: Set(movie.id), actor_id: Set(actor.id), role: Set(role) }
        .insert(db)
        .await
        .expect("link actor");
}
