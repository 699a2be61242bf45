//! HTTP adapter tests against wiremock servers

use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jobpipe_server::ai::openai::OpenAiConfig;
use jobpipe_server::ai::{Embedder, GenerationRequest, Generator, OpenAiEmbedder, OpenAiGenerator};
use jobpipe_server::sources::{
    CareerPageConfig, CareerPageSource, JobSource, OracleHcmConfig, OracleHcmSource, WorkdayConfig,
    WorkdaySource,
};

fn openai_config(server: &MockServer) -> OpenAiConfig {
    OpenAiConfig {
        api_key: "sk-test".to_string(),
        base_url: server.uri(),
        dimensions: 4,
        ..Default::default()
    }
}

fn request() -> GenerationRequest {
    GenerationRequest {
        description: "Statutory audit of listed clients".into(),
        skills: vec!["excel".into()],
        title: "Audit Associate".into(),
        company: "KPMG".into(),
    }
}

fn chat_reply(content: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "content": content.to_string() } }]
    }))
}

fn enrichment_json(guide: usize) -> serde_json::Value {
    let resume_guide = vec!["Quantify audit coverage"; guide];
    let prep_questions: Vec<serde_json::Value> = (0..5)
        .map(|i| json!({ "question": format!("Q{i}"), "answer_strategy": "STAR" }))
        .collect();
    json!({
        "resume_guide": resume_guide,
        "prep_questions": prep_questions,
        "extracted_skills": ["ifrs", "excel"],
        "estimated_salary_range": "6-8 LPA"
    })
}

#[tokio::test]
async fn test_generator_parses_enrichment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "response_format": { "type": "json_object" } })))
        .respond_with(chat_reply(enrichment_json(5)))
        .expect(1)
        .mount(&server)
        .await;

    let generator = OpenAiGenerator::new(openai_config(&server)).unwrap();
    let enrichment = generator.generate(&request()).await.unwrap();

    assert_eq!(enrichment.resume_guide.len(), 5);
    assert_eq!(enrichment.prep_questions[0].answer_strategy, "STAR");
    assert_eq!(enrichment.extracted_skills, vec!["ifrs", "excel"]);
    assert_eq!(enrichment.estimated_salary_range.as_deref(), Some("6-8 LPA"));
}

#[tokio::test]
async fn test_generator_rejects_off_shape_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(chat_reply(enrichment_json(3)))
        .mount(&server)
        .await;

    let generator = OpenAiGenerator::new(openai_config(&server)).unwrap();
    let err = generator.generate(&request()).await.unwrap_err();

    assert!(err.to_string().contains("resume_guide"));
}

#[tokio::test]
async fn test_generator_surfaces_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let generator = OpenAiGenerator::new(openai_config(&server)).unwrap();
    assert!(generator.generate(&request()).await.is_err());
}

#[tokio::test]
async fn test_embedder_checks_dimensions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({ "dimensions": 4 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "embedding": [0.1, 0.2, 0.3, 0.4] }]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "embedding": [0.1, 0.2] }]
        })))
        .mount(&server)
        .await;

    let embedder = OpenAiEmbedder::new(openai_config(&server)).unwrap();
    assert_eq!(embedder.dimensions(), 4);
    assert_eq!(embedder.encode("audit").await.unwrap(), vec![0.1, 0.2, 0.3, 0.4]);

    let err = embedder.encode("audit").await.unwrap_err();
    assert!(err.to_string().contains("Expected 4 embedding dimensions"));
}

fn workday_config(server: &MockServer) -> WorkdayConfig {
    WorkdayConfig {
        name: "pwc".to_string(),
        company: "PwC".to_string(),
        api_base: format!("{}/wday", server.uri()),
        site_url: "https://careers.example.com".to_string(),
        search_text: String::new(),
        page_size: 2,
        max_pages: 5,
        max_jobs: 10,
    }
}

#[tokio::test]
async fn test_workday_pages_filters_and_tolerates_detail_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wday/jobs"))
        .and(body_partial_json(json!({ "offset": 0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 3,
            "jobPostings": [
                { "title": "IN_ASSOCIATE_TAX_KOLKATA", "externalPath": "/job/Kolkata/Associate_1",
                  "locationsText": "Kolkata", "bulletFields": ["R1"] },
                { "title": "Analyst - Risk", "externalPath": "/job/Mumbai/Analyst_2",
                  "locationsText": "Mumbai", "bulletFields": ["R2"] }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wday/jobs"))
        .and(body_partial_json(json!({ "offset": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 3,
            "jobPostings": [
                { "title": "Senior Manager - Deals", "externalPath": "/job/Pune/Manager_3",
                  "bulletFields": ["R3"] }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wday/job/Associate_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobPostingInfo": { "jobDescription": "<p>Direct <b>tax</b> compliance</p>" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wday/job/Analyst_2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = WorkdaySource::new(Client::new(), workday_config(&server));
    let postings = source.fetch().await.unwrap();

    assert_eq!(source.name(), "pwc");
    assert_eq!(postings.len(), 2);

    assert_eq!(postings[0].external_id, "Associate_1");
    assert_eq!(postings[0].title, "Associate Tax");
    assert_eq!(postings[0].description, "Direct tax compliance");
    assert_eq!(postings[0].company_name, "PwC");
    assert_eq!(postings[0].apply_url, "https://careers.example.com/job/Kolkata/Associate_1");

    assert_eq!(postings[1].external_id, "Analyst_2");
    assert_eq!(postings[1].description, "");
}

#[tokio::test]
async fn test_workday_listing_failure_fails_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wday/jobs"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = WorkdaySource::new(Client::new(), workday_config(&server));
    let err = source.fetch().await.unwrap_err();

    assert!(format!("{:#}", err).contains("Workday search"));
}

fn oracle_config(server: &MockServer) -> OracleHcmConfig {
    OracleHcmConfig {
        name: "kpmg".to_string(),
        company: "KPMG".to_string(),
        search_url: format!("{}/reqs?onlyData=true&finder=findReqs;limit=2", server.uri()),
        detail_url: format!("{}/reqs", server.uri()),
        portal_url: "https://portal.example.com/job".to_string(),
        page_size: 2,
        max_pages: 5,
        max_jobs: 3,
    }
}

fn search_page(offset: usize, has_more: bool, requisitions: serde_json::Value) -> Mock {
    let body = json!({
        "items": [{ "requisitionList": requisitions }],
        "hasMore": has_more
    });
    Mock::given(method("GET"))
        .and(path("/reqs"))
        .and(query_param("finder", format!("findReqs;limit=2,offset={offset}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
}

#[tokio::test]
async fn test_oracle_hcm_pages_caps_and_tolerates_detail_failure() {
    let server = MockServer::start().await;

    let first = json!([
        { "Id": 101, "Title": "Associate Consultant - Tax", "PrimaryLocation": "Gurgaon" },
        { "Id": "102", "Title": "Senior Manager - Audit" }
    ]);
    let second = json!([
        { "Id": 103, "Title": "Analyst - Forensics" },
        { "Id": 104, "Title": "Graduate Trainee" }
    ]);
    search_page(0, true, first).mount(&server).await;
    search_page(2, true, second).mount(&server).await;
    // the cap is reached on the second page
    search_page(4, false, json!([{ "Id": 105, "Title": "Junior Analyst" }]))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/reqs/101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ExternalDescriptionStr": "<p>Indirect <b>tax</b> filings</p>"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reqs/103"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reqs/104"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "externalDescription": "Audit support for banking clients"
        })))
        .mount(&server)
        .await;

    let source = OracleHcmSource::new(Client::new(), oracle_config(&server));
    let postings = source.fetch().await.unwrap();

    assert_eq!(source.company(), "KPMG");
    let ids: Vec<_> = postings.iter().map(|p| p.external_id.as_str()).collect();
    assert_eq!(ids, ["101", "103", "104"]);

    assert_eq!(postings[0].description, "Indirect tax filings");
    assert_eq!(postings[0].location.as_deref(), Some("Gurgaon"));
    assert_eq!(postings[0].apply_url, "https://portal.example.com/job/101");
    assert_eq!(postings[0].company_name, "KPMG");
    assert_eq!(postings[1].description, "");
    assert_eq!(postings[2].description, "Audit support for banking clients");
}

#[tokio::test]
async fn test_oracle_hcm_search_failure_fails_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reqs"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = OracleHcmSource::new(Client::new(), oracle_config(&server));
    let err = source.fetch().await.unwrap_err();

    assert!(format!("{:#}", err).contains("Oracle HCM search"));
}

fn career_page_config(server: &MockServer) -> CareerPageConfig {
    CareerPageConfig {
        name: "ey".to_string(),
        company: "EY".to_string(),
        listing_url: format!("{}/careers/search", server.uri()),
        base_url: server.uri(),
        link_selector: "a.job-link".to_string(),
        id_pattern: r"/job/(\d+)".to_string(),
        description_selectors: vec![".job-description".to_string(), "article".to_string()],
        default_location: Some("India".to_string()),
        max_jobs: 2,
    }
}

#[tokio::test]
async fn test_career_page_caps_and_tolerates_detail_failure() {
    let server = MockServer::start().await;
    let listing = format!(
        r#"<html><body>
            <a class="job-link" href="/job/11">Associate - Audit</a>
            <a class="job-link" href="/job/12">Senior Manager - Tax</a>
            <a class="job-link" href="/job/13">Analyst - Risk</a>
            <a class="job-link" href="{}/job/14">Graduate Trainee</a>
            <a class="job-link" href="/about">About us</a>
        </body></html>"#,
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/careers/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job/11"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div class="job-description"><p>Audit <b>support</b> for listed clients</p></div></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job/13"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job/14"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<article>Trainee role</article>"))
        .expect(0)
        .mount(&server)
        .await;

    let source = CareerPageSource::new(Client::new(), career_page_config(&server));
    let postings = source.fetch().await.unwrap();

    assert_eq!(postings.len(), 2);
    assert_eq!(postings[0].external_id, "11");
    assert_eq!(postings[0].title, "Associate - Audit");
    assert_eq!(postings[0].description, "Audit support for listed clients");
    assert_eq!(postings[0].apply_url, format!("{}/job/11", server.uri()));
    assert_eq!(postings[0].location.as_deref(), Some("India"));

    assert_eq!(postings[1].external_id, "13");
    assert_eq!(postings[1].description, "");
}

#[tokio::test]
async fn test_career_page_listing_failure_fails_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/careers/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = CareerPageSource::new(Client::new(), career_page_config(&server));
    let err = source.fetch().await.unwrap_err();

    assert!(format!("{:#}", err).contains("returned an error status"));
}
