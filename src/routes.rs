use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    AppState,
    error::{AppError, AppResult},
    models::{Film, FilmId, FilmRequest, Genre, Mpa, User, UserId, UserRequest},
};

const DEFAULT_POPULAR_COUNT: usize = 10;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/films", get(list_films).post(create_film).put(update_film))
        .route("/films/popular", get(popular_films))
        .route("/films/{id}", get(get_film).delete(delete_film))
        .route("/films/{id}/like/{user_id}", put(put_like).delete(remove_like))
        .route("/users", get(list_users).post(create_user).put(update_user))
        .route("/users/{id}", get(get_user))
        .route("/mpa", get(list_mpa))
        .route("/mpa/{id}", get(get_mpa))
        .route("/genres", get(list_genres))
        .route("/genres/{id}", get(get_genre))
        .with_state(state)
}

/// A missing or malformed body is reported as `InvalidArgument`.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload.map(|Json(value)| value).map_err(|rejection| AppError::invalid(rejection.body_text()))
}

fn path<T>(param: Result<Path<T>, PathRejection>) -> AppResult<T> {
    param.map(|Path(value)| value).map_err(|rejection| AppError::invalid(rejection.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    params.map(|Query(value)| value).map_err(|rejection| AppError::invalid(rejection.body_text()))
}

async fn list_films(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Film>>> {
    Ok(Json(state.films.get_all_films().await?))
}

async fn get_film(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Film>> {
    let id = path(id)?;
    state
        .films
        .get_film_by_id(FilmId(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("film {id} not found")))
}

async fn create_film(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FilmRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Film>)> {
    let req = body(payload)?;
    req.validate()?;

    let created = state.films.create_film(req.into_film()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_film(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FilmRequest>, JsonRejection>,
) -> AppResult<Json<Film>> {
    let req = body(payload)?;
    req.validate()?;

    // An omitted `genres` field keeps the stored links.
    let replace_genres = req.genres.is_some();
    let film = req.into_film();
    let updated = if replace_genres {
        state.films.update_film_with_genres(&film).await?
    } else {
        state.films.update_film(&film).await?
    };
    Ok(Json(updated))
}

async fn delete_film(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let id = path(id)?;
    let film = state
        .films
        .get_film_by_id(FilmId(id))
        .await?
        .ok_or_else(|| AppError::not_found(format!("film {id} not found")))?;
    state.films.delete_film(&film).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn put_like(
    State(state): State<Arc<AppState>>,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> AppResult<Json<usize>> {
    let (id, user_id) = path(ids)?;
    Ok(Json(state.films.put_like(FilmId(id), UserId(user_id)).await?))
}

async fn remove_like(
    State(state): State<Arc<AppState>>,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> AppResult<Json<usize>> {
    let (id, user_id) = path(ids)?;
    Ok(Json(state.films.remove_like(FilmId(id), UserId(user_id)).await?))
}

#[derive(Debug, Deserialize)]
struct PopularQuery {
    count: Option<usize>,
}

async fn popular_films(
    State(state): State<Arc<AppState>>,
    q: Result<Query<PopularQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Film>>> {
    let q = query(q)?;
    let count = q.count.unwrap_or(DEFAULT_POPULAR_COUNT);
    debug!(count, "popular films requested");
    Ok(Json(state.films.get_popular_films(count).await?))
}

async fn list_users(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.users.get_all_users().await?))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<User>> {
    Ok(Json(state.users.get_user_by_id(UserId(path(id)?)).await?))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<User>)> {
    let req = body(payload)?;
    req.validate(jiff::Zoned::now().date())?;
    let user = state.users.create_user(req.into_user()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> AppResult<Json<User>> {
    let req = body(payload)?;
    req.validate(jiff::Zoned::now().date())?;
    Ok(Json(state.users.update_user(req.into_user()).await?))
}

async fn list_mpa(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Mpa>>> {
    Ok(Json(state.reference.get_all_mpa().await?))
}

async fn get_mpa(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i32>, PathRejection>,
) -> AppResult<Json<Mpa>> {
    Ok(Json(state.reference.get_mpa_by_id(path(id)?).await?))
}

async fn list_genres(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(state.reference.get_all_genres().await?))
}

async fn get_genre(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i32>, PathRejection>,
) -> AppResult<Json<Genre>> {
    Ok(Json(state.reference.get_genre_by_id(path(id)?).await?))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::db;

    async fn app() -> Router {
        router(Arc::new(AppState::new(db::memory().await)))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                req = req.header("content-type", "application/json");
                Body::from(value.to_string())
            },
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    fn matrix() -> Value {
        json!({
            "name": "Matrix",
            "description": "A hacker learns the truth about reality.",
            "releaseDate": "1999-03-31",
            "duration": 136,
            "mpa": { "id": 3, "name": "PG-13" },
            "genres": [{ "id": 6 }, { "id": 4 }]
        })
    }

    fn neo() -> Value {
        json!({ "email": "neo@zion.org", "login": "neo", "name": "", "birthday": "1971-09-13" })
    }

    #[tokio::test]
    async fn create_and_fetch_film() {
        let app = app().await;
        let (status, created) = send(&app, Method::POST, "/films", Some(matrix())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().unwrap();
        assert!(id > 0);
        assert_eq!(created["releaseDate"], "1999-03-31");
        assert_eq!(created["mpa"]["name"], "PG-13");
        assert_eq!(created["genres"][0]["name"], "Action");

        let (status, fetched) = send(&app, Method::GET, &format!("/films/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn maps_errors_to_status_codes() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/films/0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");

        let (status, _) = send(&app, Method::GET, "/films/12", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::POST, "/films", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut bad = matrix();
        bad["duration"] = json!(-1);
        let (status, _) = send(&app, Method::POST, "/films", Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn like_flow_returns_counts_and_conflict() {
        let app = app().await;
        let (_, film) = send(&app, Method::POST, "/films", Some(matrix())).await;
        let (status, user) = send(&app, Method::POST, "/users", Some(neo())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user["name"], "neo");

        let uri = format!("/films/{}/like/{}", film["id"], user["id"]);
        let (status, count) = send(&app, Method::PUT, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(count, json!(1));

        let (status, body) = send(&app, Method::PUT, &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");

        let (_, popular) = send(&app, Method::GET, "/films/popular?count=1", None).await;
        assert_eq!(popular[0]["likes"], json!([user["id"]]));

        let (status, count) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(count, json!(0));
    }

    #[tokio::test]
    async fn update_replaces_genres_only_when_given() {
        let app = app().await;
        let (_, film) = send(&app, Method::POST, "/films", Some(matrix())).await;

        let mut update = matrix();
        update["id"] = film["id"].clone();
        update["name"] = json!("The Matrix");
        update.as_object_mut().unwrap().remove("genres");
        let (status, updated) = send(&app, Method::PUT, "/films", Some(update.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "The Matrix");
        assert_eq!(updated["genres"].as_array().unwrap().len(), 2);

        update["genres"] = json!([{ "id": 2 }]);
        let (_, updated) = send(&app, Method::PUT, "/films", Some(update)).await;
        assert_eq!(updated["genres"], json!([{ "id": 2, "name": "Drama" }]));
    }

    #[tokio::test]
    async fn rejected_create_leaves_no_film() {
        let app = app().await;

        let mut unknown_genre = matrix();
        unknown_genre["genres"] = json!([{ "id": 1 }, { "id": 99 }]);
        let (status, body) = send(&app, Method::POST, "/films", Some(unknown_genre)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let mut unknown_mpa = matrix();
        unknown_mpa["mpa"] = json!({ "id": 42 });
        let (status, _) = send(&app, Method::POST, "/films", Some(unknown_mpa)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, all) = send(&app, Method::GET, "/films", None).await;
        assert_eq!(all, json!([]));
        let (status, _) = send(&app, Method::GET, "/films/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rejected_update_leaves_film_unchanged() {
        let app = app().await;
        let (_, film) = send(&app, Method::POST, "/films", Some(matrix())).await;
        let uri = format!("/films/{}", film["id"]);
        let (_, before) = send(&app, Method::GET, "/films", None).await;

        let mut unknown_genre = matrix();
        unknown_genre["id"] = film["id"].clone();
        unknown_genre["name"] = json!("Changed");
        unknown_genre["genres"] = json!([{ "id": 99 }]);
        let (status, _) = send(&app, Method::PUT, "/films", Some(unknown_genre)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let mut unknown_mpa = matrix();
        unknown_mpa["id"] = film["id"].clone();
        unknown_mpa["name"] = json!("Changed");
        unknown_mpa["mpa"] = json!({ "id": 42 });
        let (status, _) = send(&app, Method::PUT, "/films", Some(unknown_mpa)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, fetched) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(fetched, film);
        assert_eq!(fetched["name"], "Matrix");
        let (_, after) = send(&app, Method::GET, "/films", None).await;
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn malformed_path_and_query_get_json_errors() {
        let app = app().await;
        for uri in ["/films/abc", "/users/abc", "/mpa/abc", "/films/popular?count=-1"] {
            let (status, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"]["code"], "INVALID_ARGUMENT", "{uri}");
        }

        let (status, body) = send(&app, Method::PUT, "/films/1/like/x", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn delete_then_list_omits_film() {
        let app = app().await;
        let (_, film) = send(&app, Method::POST, "/films", Some(matrix())).await;
        let uri = format!("/films/{}", film["id"]);

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, all) = send(&app, Method::GET, "/films", None).await;
        assert_eq!(all, json!([]));
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn serves_reference_data() {
        let app = app().await;
        let (status, mpa) = send(&app, Method::GET, "/mpa/5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mpa, json!({ "id": 5, "name": "NC-17" }));

        let (_, genres) = send(&app, Method::GET, "/genres", None).await;
        assert_eq!(genres.as_array().unwrap().len(), 6);

        let (status, _) = send(&app, Method::GET, "/genres/100", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
