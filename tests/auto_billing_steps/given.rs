//! Given steps for auto-billing BDD scenarios.

use std::str::FromStr;

use super::world::{BillingWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use rust_decimal::Decimal;
use timebill::billing::{
    domain::{
        BillingProfile, BillingType, ClientId, PersistedTaskData, Project, ProjectId,
        ProjectStatus, Task, TaskId, TaskStatus,
    },
    services::StartTimerRequest,
};

#[given("a freelancer with an hourly project")]
fn freelancer_with_hourly_project(world: &mut BillingWorld) -> Result<(), eyre::Report> {
    world
        .store
        .insert_profile(BillingProfile::new(world.user))
        .wrap_err("seed billing profile")?;
    let project = Project {
        id: ProjectId::new(),
        user_id: world.user,
        client_id: ClientId::new(),
        name: "Website redesign".to_owned(),
        status: ProjectStatus::InProgress,
        billing_type: BillingType::Hourly,
        hourly_rate: None,
        fixed_amount: None,
    };
    world
        .store
        .insert_project(project.clone())
        .wrap_err("seed project")?;
    world.project = Some(project);
    Ok(())
}

#[given(r#"a task "{title}" with {hours} hours worked at {rate} per hour"#)]
fn task_with_hours(
    world: &mut BillingWorld,
    title: String,
    hours: String,
    rate: String,
) -> Result<(), eyre::Report> {
    let project = world
        .project
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing project in scenario world"))?;
    let now = chrono::Utc::now();
    let task = Task::from_persisted(PersistedTaskData {
        id: TaskId::new(),
        project_id: project.id,
        title,
        status: TaskStatus::InProgress,
        hours_worked: Decimal::from_str(&hours).wrap_err("parse hours")?,
        hourly_rate: Some(Decimal::from_str(&rate).wrap_err("parse rate")?),
        is_billed: false,
        created_at: now,
        updated_at: now,
    });
    world.task = Some(task.id());
    world.store.insert_task(task).wrap_err("seed task")?;
    Ok(())
}

#[given("a running timer on the task")]
fn running_timer(world: &mut BillingWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let entry = run_async(
        world
            .engine
            .timer()
            .start_timer(StartTimerRequest::new(world.user, task_id)),
    )
    .wrap_err("start timer in scenario setup")?;
    world.running_entry = Some(entry.id());
    world.clock.advance(600);
    Ok(())
}
