// HTTP surface: routes, status mapping, CSV download and metrics.

#[cfg(test)]
mod test {

use httpmock::Method::GET;
use httpmock::MockServer;
use reqwest::StatusCode;
use serde_json::Value;
use tempfile::TempDir;

use crate::server::server::build_router;
use crate::service::grade_service::GradeService;
use crate::tests::common::{build_reqwest_client, json, mock_token, spawn_axum, test_config, write_snapshot};

/// Upstream with one student, one class and one grade.
fn mock_upstream(server: &MockServer) {
    mock_token(server, "tok-1");
    server.mock(|when, then| {
        when.method(GET).path("/roster/students/S1/classes");
        then.status(200).json_body(json!({"classes": []}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/roster/students/S1");
        then.status(200).json_body(json!({"user": {"identifier": "4411"}}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/v3/academics/enrollments").query_param("person_id", "4411");
        then.status(200).json_body(json!({"data": [{"id": 11, "class_description": "Math"}]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/v3/report_card/enrollments/11/qualitative_grades");
        then.status(200).json_body(json!({"data": [
            {"proficiency_level": {"abbreviation": "3"}, "grading_period": {"abbreviation": "Q1"}, "rubric_criteria": {"description": "Effort"}},
            {"proficiency_level": {"abbreviation": "4"}, "grading_period": {"abbreviation": "Q2"}, "rubric_criteria": {"description": "Effort"}}
        ]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/roster/students");
        then.status(200).json_body(json!({"users": [{"sourcedId": "S1", "email": "a@b.com"}]}));
    });
}

async fn spawn_app(server: &MockServer, dir: &TempDir) -> (tokio::task::JoinHandle<()>, String) {
    let index_path = dir.path().join("student_list.json");
    write_snapshot(&index_path, &[("S1", "a@b.com")]);
    let mut config = test_config(&server.base_url(), &index_path, true).await;
    config.settings.metrics.is_enabled = true;

    let grades = GradeService::from_config(&config).await.expect("service");
    let router = build_router(&config.settings, grades).await;
    let (handle, addr) = spawn_axum(router).await;
    (handle, format!("http://{}", addr))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn grades_routes_map_errors_and_serve_rows() {
    let server = MockServer::start_async().await;
    mock_upstream(&server);
    let dir = TempDir::new().unwrap();
    let (handle, base) = spawn_app(&server, &dir).await;
    let client = build_reqwest_client();

    let resp = client.get(format!("{base}/grades?email=nobody@school.org")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("nobody@school.org"));

    let resp = client.get(format!("{base}/grades?email=not-an-email")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client.get(format!("{base}/grades?email=a@b.com")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let rows: Value = resp.json().await.unwrap();
    assert_eq!(
        rows,
        json!([
            {"class": "Math", "grading_period": "Q1", "description": "Effort", "score": "3"},
            {"class": "Math", "grading_period": "Q2", "description": "Effort", "score": "4"}
        ])
    );

    handle.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn csv_trends_rebuild_and_metrics() {
    let server = MockServer::start_async().await;
    mock_upstream(&server);
    let dir = TempDir::new().unwrap();
    let (handle, base) = spawn_app(&server, &dir).await;
    let client = build_reqwest_client();

    let resp = client.get(format!("{base}/grades.csv?email=a@b.com")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()["content-type"].to_str().unwrap().starts_with("text/csv"));
    assert!(resp.headers()["content-disposition"].to_str().unwrap().contains("student_data.csv"));
    let text = resp.text().await.unwrap();
    assert_eq!(text, "class,grading_period,description,score\nMath,Q1,Effort,3\nMath,Q2,Effort,4\n");

    let resp = client.get(format!("{base}/trends?email=a@b.com")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let trends: Value = resp.json().await.unwrap();
    assert_eq!(trends[0]["class"], "Math");
    assert_eq!(trends[0]["periods"], json!(["Q1", "Q2"]));
    assert_eq!(trends[0]["scores"], json!([[3.0], [4.0]]));

    let resp = client.post(format!("{base}/students/rebuild")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let summary: Value = resp.json().await.unwrap();
    assert_eq!(summary["students"], 3, "one user per offset page");
    assert!(summary["updated_at"].is_string());

    let resp = client.get(format!("{base}/metrics")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let text = resp.text().await.unwrap();
    assert!(text.contains("interimreport_lookups_total"));
    assert!(text.contains("interimreport_upstream_requests_total"));

    handle.abort();
}

}
