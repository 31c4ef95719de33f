//! Repair-ticket workflow: transitions, history and cost roll-up.

mod common;

use cellstock_api::entities::service_job::ServiceJobStatus;
use cellstock_api::errors::ServiceError;
use cellstock_api::services::service_jobs::NewServiceJob;

fn job_input(customer: &str) -> NewServiceJob {
    NewServiceJob {
        customer_name: customer.to_string(),
        customer_phone: Some("+910000011111".to_string()),
        customer_id: None,
        device_name: "Pixel 7".to_string(),
        imei: Some("999999999999999".to_string()),
        problem_description: "Cracked screen".to_string(),
        estimated_cost: 120.0,
        advance_paid: 20.0,
        notes: None,
    }
}

#[tokio::test]
async fn new_jobs_start_received_with_history() {
    let (_db, services) = common::setup().await;

    let job = services
        .service_jobs
        .create(job_input("Ravi"), "frontdesk")
        .await
        .unwrap();
    assert!(job.job_number.starts_with("SRV-"));
    assert_eq!(job.status, "received");

    let detail = services.service_jobs.get(job.id).await.unwrap();
    assert_eq!(detail.status_history.len(), 1);
    assert_eq!(detail.status_history[0].to_status, "received");
    assert!(detail.status_history[0].from_status.is_none());
}

#[tokio::test]
async fn transitions_append_history_rows() {
    let (_db, services) = common::setup().await;
    let job = services
        .service_jobs
        .create(job_input("Meera"), "frontdesk")
        .await
        .unwrap();

    services
        .service_jobs
        .transition(job.id, ServiceJobStatus::InDiagnosis, None, "tech")
        .await
        .unwrap();
    services
        .service_jobs
        .transition(
            job.id,
            ServiceJobStatus::InRepair,
            Some("screen ordered".to_string()),
            "tech",
        )
        .await
        .unwrap();

    let detail = services.service_jobs.get(job.id).await.unwrap();
    assert_eq!(detail.job.status, "in_repair");
    assert_eq!(detail.status_history.len(), 3);
    let last = detail.status_history.last().unwrap();
    assert_eq!(last.from_status.as_deref(), Some("in_diagnosis"));
    assert_eq!(last.to_status, "in_repair");
}

#[tokio::test]
async fn terminal_states_reject_further_transitions() {
    let (_db, services) = common::setup().await;
    let job = services
        .service_jobs
        .create(job_input("Vikram"), "frontdesk")
        .await
        .unwrap();

    services
        .service_jobs
        .transition(job.id, ServiceJobStatus::Delivered, None, "frontdesk")
        .await
        .unwrap();

    let err = services
        .service_jobs
        .transition(job.id, ServiceJobStatus::InRepair, None, "frontdesk")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn repeating_the_current_status_is_rejected() {
    let (_db, services) = common::setup().await;
    let job = services
        .service_jobs
        .create(job_input("Nina"), "frontdesk")
        .await
        .unwrap();

    let err = services
        .service_jobs
        .transition(job.id, ServiceJobStatus::Received, None, "frontdesk")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn cost_rolls_up_from_parts_and_labor() {
    let (_db, services) = common::setup().await;
    let job = services
        .service_jobs
        .create(job_input("Farah"), "frontdesk")
        .await
        .unwrap();

    services
        .service_jobs
        .add_part(job.id, "OLED panel".to_string(), 1, 80.0)
        .await
        .unwrap();
    services
        .service_jobs
        .add_part(job.id, "Adhesive kit".to_string(), 2, 5.0)
        .await
        .unwrap();
    services
        .service_jobs
        .add_labor_charge(job.id, "Screen replacement".to_string(), 30.0)
        .await
        .unwrap();

    let detail = services.service_jobs.get(job.id).await.unwrap();
    assert_eq!(detail.job.total_cost, 120.0);
    assert_eq!(detail.parts.len(), 2);
    assert_eq!(detail.labor_charges.len(), 1);
}

#[tokio::test]
async fn closed_jobs_reject_new_lines() {
    let (_db, services) = common::setup().await;
    let job = services
        .service_jobs
        .create(job_input("Omar"), "frontdesk")
        .await
        .unwrap();
    services
        .service_jobs
        .transition(job.id, ServiceJobStatus::Cancelled, None, "frontdesk")
        .await
        .unwrap();

    let err = services
        .service_jobs
        .add_part(job.id, "Battery".to_string(), 1, 40.0)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn status_filter_uses_the_closed_enum() {
    let (_db, services) = common::setup().await;
    services
        .service_jobs
        .create(job_input("Lena"), "frontdesk")
        .await
        .unwrap();

    let received = services.service_jobs.list(Some("received")).await.unwrap();
    assert_eq!(received.len(), 1);

    let err = services.service_jobs.list(Some("being fixed")).await.unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}
