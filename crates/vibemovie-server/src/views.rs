//! Server-rendered HTML pages

use crate::extractors::Flash;
use crate::utils::{escape_html, percent_encode};
use std::fmt::Write;
use vibemovie_core::{format_average, Comment, Movie, Rating};

/// Everything shown on a movie page
#[derive(Debug, Clone)]
pub struct MovieDetail {
    pub movie: Movie,
    pub ratings: Vec<Rating>,
    pub comments: Vec<Comment>,
    pub average: Option<f64>,
}

pub fn movie_href(id: &str) -> String {
    format!("/movies/{}", percent_encode(id))
}

fn layout(title: &str, flashes: &[Flash], store_error: Option<&str>, body: &str) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{} - VibeMovie</title>\n</head>\n<body>\n\
         <header><a href=\"/\">VibeMovie</a></header>\n",
        escape_html(title)
    );

    for flash in flashes {
        let _ = writeln!(
            html,
            "<div class=\"flash flash-{}\">{}</div>",
            flash.level.as_str(),
            escape_html(&flash.message)
        );
    }

    if let Some(error) = store_error {
        let _ = writeln!(
            html,
            "<div class=\"store-error\">Database unavailable: {}</div>",
            escape_html(error)
        );
    }

    html.push_str("<main>\n");
    html.push_str(body);
    html.push_str("</main>\n</body>\n</html>\n");
    html
}

pub fn index(movies: &[Movie], flashes: &[Flash], store_error: Option<&str>) -> String {
    let mut body = String::from(
        "<h1>Movies</h1>\n\
         <form method=\"post\" action=\"/movies\">\n\
         <input name=\"title\" placeholder=\"Movie title\" required>\n\
         <button type=\"submit\">Add movie</button>\n\
         </form>\n",
    );

    if movies.is_empty() {
        body.push_str("<p>No movies yet</p>\n");
    } else {
        body.push_str("<ul class=\"movies\">\n");
        for movie in movies {
            let _ = writeln!(
                body,
                "<li><a href=\"{}\">{}</a></li>",
                escape_html(&movie_href(&movie.id)),
                escape_html(&movie.title)
            );
        }
        body.push_str("</ul>\n");
    }

    layout("Movies", flashes, store_error, &body)
}

pub fn movie(detail: Option<&MovieDetail>, flashes: &[Flash], store_error: Option<&str>) -> String {
    let Some(detail) = detail else {
        return layout(
            "Movie",
            flashes,
            store_error,
            "<p>Movie details are unavailable right now.</p>\n<p><a href=\"/\">Back to movies</a></p>\n",
        );
    };

    let href = escape_html(&movie_href(&detail.movie.id));
    let mut body = String::new();
    let _ = writeln!(body, "<h1>{}</h1>", escape_html(&detail.movie.title));

    match detail.average {
        Some(avg) => {
            let _ = writeln!(
                body,
                "<p class=\"average\">Average rating: {} / 5 ({} ratings)</p>",
                format_average(avg),
                detail.ratings.len()
            );
        }
        None => body.push_str("<p class=\"average\">No ratings yet</p>\n"),
    }

    let _ = write!(
        body,
        "<form method=\"post\" action=\"{}/rate\">\n<select name=\"stars\">\n",
        href
    );
    for stars in 0..=5 {
        let _ = writeln!(body, "<option value=\"{0}\">{0}</option>", stars);
    }
    body.push_str("</select>\n<button type=\"submit\">Rate</button>\n</form>\n");

    if !detail.ratings.is_empty() {
        body.push_str("<ul class=\"ratings\">\n");
        for rating in &detail.ratings {
            let _ = writeln!(body, "<li>{} / 5</li>", rating.stars);
        }
        body.push_str("</ul>\n");
    }

    body.push_str("<h2>Comments</h2>\n");
    if detail.comments.is_empty() {
        body.push_str("<p>No comments yet</p>\n");
    } else {
        body.push_str("<ul class=\"comments\">\n");
        for comment in &detail.comments {
            let _ = writeln!(body, "<li>{}</li>", escape_html(&comment.text));
        }
        body.push_str("</ul>\n");
    }

    let _ = write!(
        body,
        "<form method=\"post\" action=\"{}/comment\">\n\
         <textarea name=\"text\" required></textarea>\n\
         <button type=\"submit\">Comment</button>\n</form>\n",
        href
    );

    layout(&detail.movie.title, flashes, store_error, &body)
}
