use std::collections::HashMap;
use std::sync::Arc;

use actix_web::web::Data;
use actix_web::{web, Error, HttpResponse};
use serde_json::Value;

use crate::document_store::DocumentStore;

pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

pub async fn list_documents(
    store: Data<Arc<dyn DocumentStore>>,
    collection: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, Error> {
    let filters: Vec<(String, String)> = query.into_inner().into_iter().collect();
    Ok(match store.list(&collection, &filters).await {
        Ok(documents) => HttpResponse::Ok().json(documents),
        Err(err) => {
            tracing::error!("List documents failed {}", err);
            HttpResponse::InternalServerError().finish()
        }
    })
}

pub async fn create_document(
    store: Data<Arc<dyn DocumentStore>>,
    collection: web::Path<String>,
    document: web::Json<Value>,
) -> Result<HttpResponse, Error> {
    Ok(
        match store.create(&collection, document.into_inner()).await {
            Ok(stored) => HttpResponse::Created().json(stored),
            Err(err) => {
                tracing::error!("Create document failed {}", err);
                HttpResponse::InternalServerError().finish()
            }
        },
    )
}

pub async fn get_document(
    store: Data<Arc<dyn DocumentStore>>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, Error> {
    let (collection, id) = path.into_inner();
    Ok(match store.get(&collection, &id).await {
        Ok(Some(document)) => HttpResponse::Ok().json(document),
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(err) => {
            tracing::error!("Get document failed {}", err);
            HttpResponse::InternalServerError().finish()
        }
    })
}

pub async fn patch_document(
    store: Data<Arc<dyn DocumentStore>>,
    path: web::Path<(String, String)>,
    patch: web::Json<Value>,
) -> Result<HttpResponse, Error> {
    let (collection, id) = path.into_inner();
    Ok(
        match store.patch(&collection, &id, patch.into_inner()).await {
            Ok(Some(document)) => HttpResponse::Ok().json(document),
            Ok(None) => HttpResponse::NotFound().finish(),
            Err(err) => {
                tracing::error!("Patch document failed {}", err);
                HttpResponse::InternalServerError().finish()
            }
        },
    )
}

pub async fn delete_document(
    store: Data<Arc<dyn DocumentStore>>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, Error> {
    let (collection, id) = path.into_inner();
    Ok(match store.delete(&collection, &id).await {
        Ok(true) => HttpResponse::Ok().json(Value::Object(Default::default())),
        Ok(false) => HttpResponse::NotFound().finish(),
        Err(err) => {
            tracing::error!("Delete document failed {}", err);
            HttpResponse::InternalServerError().finish()
        }
    })
}

#[cfg(test)]
mod handler_tests {
    use std::sync::Arc;

    use actix_web::{test, App};
    use serde_json::{json, Value};

    use crate::app_config::config_app;
    use crate::document_store::{DocumentStore, InMemoryDocumentStore};

    fn store() -> actix_web::web::Data<Arc<dyn DocumentStore>> {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        actix_web::web::Data::new(store)
    }

    #[actix_web::test]
    async fn test_create_get_patch_delete_roundtrip() {
        let app =
            test::init_service(App::new().app_data(store()).configure(config_app)).await;

        let req = test::TestRequest::post()
            .uri("/books")
            .set_json(json!({"id": "1", "title": "Dune", "rentedBy": null}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);

        let req = test::TestRequest::get().uri("/books/1").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["title"], "Dune");

        let req = test::TestRequest::patch()
            .uri("/books/1")
            .set_json(json!({"rentedBy": "u1"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["rentedBy"], "u1");

        let req = test::TestRequest::delete().uri("/books/1").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::get().uri("/books/1").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_list_with_query_filter() {
        let app =
            test::init_service(App::new().app_data(store()).configure(config_app)).await;

        for (id, rented_by) in [("1", json!("u1")), ("2", json!("u2")), ("3", json!(null))] {
            let req = test::TestRequest::post()
                .uri("/books")
                .set_json(json!({"id": id, "title": "t", "rentedBy": rented_by}))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::get()
            .uri("/books?rentedBy=u1")
            .to_request();
        let body: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.len(), 1);
        assert_eq!(body[0]["id"], "1");

        let req = test::TestRequest::get().uri("/books").to_request();
        let body: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.len(), 3);
    }

    #[actix_web::test]
    async fn test_missing_document_is_not_found() {
        let app =
            test::init_service(App::new().app_data(store()).configure(config_app)).await;

        let req = test::TestRequest::patch()
            .uri("/books/404")
            .set_json(json!({"title": "x"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete().uri("/books/404").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }
}
