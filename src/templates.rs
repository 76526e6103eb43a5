use axum::http::StatusCode;
use maud::{DOCTYPE, Markup, html};

use crate::{
    entities::{actor, movie},
    models::{ActorDetail, MovieDetail, Page, ReviewNode, Sidebar},
};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";

/// Where a listing lives and which query string reproduces it, so pagination
/// links keep the active filter or search term.
pub struct Listing<'a> {
    pub heading: &'a str,
    pub path: &'a str,
    pub query: String,
}

impl Listing<'_> {
    fn page_href(&self, number: u64) -> String {
        format!("{}?{}page={}", self.path, self.query, number)
    }
}

pub fn movie_list_page(listing: &Listing<'_>, page: &Page<movie::Model>, sidebar: &Sidebar) -> String {
    layout(
        listing.heading,
        sidebar,
        html! {
            h1 class="text-3xl font-bold text-gray-900" { (listing.heading) }

            @if page.items.is_empty() {
                div class="mt-8 bg-white shadow rounded-lg p-8" {
                    p class="text-gray-600" { "No movies found." }
                }
            } @else {
                div class="mt-8 grid gap-6 md:grid-cols-3" {
                    @for movie in &page.items {
                        (movie_card(movie))
                    }
                }
            }

            @if page.num_pages > 1 {
                nav class="mt-8 flex items-center justify-between text-sm" {
                    @if page.has_previous() {
                        a class="text-blue-600 hover:text-blue-800" href=(listing.page_href(page.number - 1)) { "Previous" }
                    } @else {
                        span {}
                    }
                    span class="text-gray-500" { "Page " (page.number) " of " (page.num_pages) }
                    @if page.has_next() {
                        a class="text-blue-600 hover:text-blue-800" href=(listing.page_href(page.number + 1)) { "Next" }
                    } @else {
                        span {}
                    }
                }
            }
        },
    )
}

pub fn movie_detail_page(detail: &MovieDetail, sidebar: &Sidebar) -> String {
    let movie = &detail.movie;
    let genres: Vec<&str> = detail.genres.iter().map(|g| g.name.as_str()).collect();
    layout(
        &movie.title,
        sidebar,
        html! {
            div class="bg-white shadow rounded-lg p-8" {
                div class="flex gap-8" {
                    img class="w-48 rounded" src=(poster_src(&movie.poster)) alt=(movie.title);
                    div {
                        h1 class="text-3xl font-bold text-gray-900" { (movie.title) " (" (movie.year) ")" }
                        p class="mt-2 italic text-gray-600" { (movie.tagline) }
                        dl class="mt-4 grid grid-cols-[auto,1fr] gap-x-4 gap-y-1 text-sm text-gray-700" {
                            dt class="font-semibold" { "Country" } dd { (movie.country) }
                            @if let Some(category) = &detail.category {
                                dt class="font-semibold" { "Category" } dd { (category.name) }
                            }
                            dt class="font-semibold" { "Genres" }
                            dd { (genres.join(", ")) }
                            dt class="font-semibold" { "Directed by" }
                            dd { (people(&detail.directors)) }
                            dt class="font-semibold" { "Starring" }
                            dd { (people(&detail.actors)) }
                        }
                    }
                }

                p class="mt-6 text-gray-700" { (movie.description) }

                form class="mt-6" method="post" action="/rating/" {
                    input type="hidden" name="movie" value=(movie.id);
                    span class="text-sm font-medium text-gray-700" { "Rate it: " }
                    @for star in &detail.stars {
                        label class="ml-2 text-sm" {
                            input type="radio" name="star" value=(star.id);
                            " " (star.value)
                        }
                    }
                    button class="ml-4 rounded-md bg-blue-600 px-3 py-1 text-sm text-white" type="submit" { "Vote" }
                    @if let Some(stars) = &detail.user_stars {
                        p class="mt-2 text-sm text-gray-500" { "Your rating: " (stars) }
                    }
                }
            }

            div class="mt-8 bg-white shadow rounded-lg p-8" {
                h2 class="text-xl font-semibold text-gray-900" { "Reviews" }
                @if detail.reviews.is_empty() {
                    p class="mt-2 text-gray-500" { "No reviews yet." }
                }
                ul class="mt-4 space-y-4" {
                    @for node in &detail.reviews {
                        (review_node(node, movie.id))
                    }
                }
                (review_form(movie.id, None))
            }
        },
    )
}

pub fn actor_page(detail: &ActorDetail, sidebar: &Sidebar) -> String {
    let actor = &detail.actor;
    layout(
        &actor.name,
        sidebar,
        html! {
            div class="bg-white shadow rounded-lg p-8" {
                div class="flex gap-8" {
                    img class="w-40 rounded" src=(poster_src(&actor.image)) alt=(actor.name);
                    div {
                        h1 class="text-3xl font-bold text-gray-900" { (actor.name) }
                        p class="mt-1 text-gray-500" { "Age " (actor.age) }
                        p class="mt-4 text-gray-700" { (actor.description) }
                    }
                }
            }
            @if !detail.movies.is_empty() {
                h2 class="mt-8 text-xl font-semibold text-gray-900" { "Filmography" }
                div class="mt-4 grid gap-6 md:grid-cols-3" {
                    @for movie in &detail.movies {
                        (movie_card(movie))
                    }
                }
            }
        },
    )
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    page(
        status.canonical_reason().unwrap_or("Error"),
        html! {
            div class="min-h-screen bg-gray-50 flex items-center justify-center" {
                div class="max-w-xl w-full px-6" {
                    div class="bg-white shadow rounded-lg p-8" {
                        h1 class="text-2xl font-bold text-gray-900" { (status.as_u16()) }
                        p class="mt-4 text-gray-700" { (message) }
                        a class="mt-6 inline-block text-blue-600 hover:text-blue-800" href="/" { "Back" }
                    }
                }
            }
        },
    )
}

fn layout(title: &str, sidebar: &Sidebar, main: Markup) -> String {
    page(
        title,
        html! {
            div class="min-h-screen bg-gray-50" {
                header class="bg-white shadow" {
                    div class="max-w-6xl mx-auto px-6 py-4 flex items-center justify-between" {
                        a class="text-xl font-bold text-gray-900" href="/" { "cinedex" }
                        nav class="flex gap-4 text-sm text-gray-600" {
                            @for category in &sidebar.categories {
                                span { (category.name) }
                            }
                        }
                        form method="get" action="/search/" {
                            input class="rounded-md border border-gray-300 px-3 py-1 text-sm" name="q" placeholder="Search";
                        }
                    }
                }
                div class="max-w-6xl mx-auto px-6 py-10 flex gap-8" {
                    main class="flex-1" { (main) }
                    (side_panel(sidebar))
                }
            }
        },
    )
}

fn side_panel(sidebar: &Sidebar) -> Markup {
    html! {
        aside class="w-56 space-y-8" {
            form method="get" action="/filter/" class="bg-white shadow rounded-lg p-4" {
                h3 class="text-sm font-semibold text-gray-700" { "Genres" }
                @for genre in &sidebar.genres {
                    label class="block text-sm text-gray-700" {
                        input type="checkbox" name="genre" value=(genre.id);
                        " " (genre.name)
                    }
                }
                h3 class="mt-4 text-sm font-semibold text-gray-700" { "Years" }
                @for year in &sidebar.years {
                    label class="block text-sm text-gray-700" {
                        input type="checkbox" name="year" value=(year);
                        " " (year)
                    }
                }
                button class="mt-4 w-full rounded-md bg-blue-600 px-3 py-1 text-sm text-white" type="submit" { "Filter" }
            }

            @if !sidebar.latest.is_empty() {
                div class="bg-white shadow rounded-lg p-4" {
                    h3 class="text-sm font-semibold text-gray-700" { "Latest movies" }
                    ul class="mt-2 space-y-1" {
                        @for movie in &sidebar.latest {
                            li { a class="text-sm text-blue-600 hover:text-blue-800" href=(movie_href(movie)) { (movie.title) } }
                        }
                    }
                }
            }
        }
    }
}

fn movie_card(movie: &movie::Model) -> Markup {
    html! {
        a class="block bg-white shadow rounded-lg p-4 hover:shadow-md" href=(movie_href(movie)) data-movie=(movie.url) {
            img class="w-full rounded" src=(poster_src(&movie.poster)) alt=(movie.title);
            h2 class="mt-3 font-semibold text-gray-900" { (movie.title) }
            p class="text-sm text-gray-500" { (movie.tagline) }
        }
    }
}

fn review_node(node: &ReviewNode, movie_id: i32) -> Markup {
    html! {
        li class="border-l-4 border-blue-200 pl-4" {
            p class="text-sm font-medium text-gray-900" { (node.review.email) }
            p class="mt-1 text-gray-700" { (node.review.text) }
            details class="mt-1 text-sm" {
                summary class="cursor-pointer text-blue-600" { "Reply" }
                (review_form(movie_id, Some(node.review.id)))
            }
            @if !node.replies.is_empty() {
                ul class="mt-3 space-y-3" {
                    @for reply in &node.replies {
                        (review_node(reply, movie_id))
                    }
                }
            }
        }
    }
}

fn review_form(movie_id: i32, parent: Option<i32>) -> Markup {
    html! {
        form class="mt-4 space-y-2" method="post" action=(format!("/{movie_id}/review/")) {
            input type="hidden" name="parent" value=[parent];
            input class="w-full rounded-md border border-gray-300 px-3 py-1" type="email" name="email" placeholder="Email" required;
            textarea class="w-full rounded-md border border-gray-300 px-3 py-1" name="text" rows="3" maxlength="5000" required {}
            button class="rounded-md bg-blue-600 px-3 py-1 text-sm text-white" type="submit" { "Send" }
        }
    }
}

fn people(list: &[actor::Model]) -> Markup {
    html! {
        @for (i, person) in list.iter().enumerate() {
            @if i > 0 { ", " }
            a class="text-blue-600 hover:text-blue-800" href=(format!("/actor/{}/", urlencoding::encode(&person.name))) { (person.name) }
        }
    }
}

pub fn movie_href(movie: &movie::Model) -> String {
    format!("/{}/", urlencoding::encode(&movie.url))
}

fn poster_src(path: &str) -> String {
    format!("/media/{}", path.trim_start_matches('/'))
}

fn page(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                script src=(TAILWIND_CDN) {}
            }
            body { (body) }
        }
    }
    .into_string()
}
