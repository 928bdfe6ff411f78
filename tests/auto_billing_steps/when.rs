//! When steps for auto-billing BDD scenarios.

use super::world::{BillingWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use timebill::billing::{domain::TaskStatus, services::StartTimerRequest};

#[when("the task is marked as completed")]
fn mark_completed(world: &mut BillingWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let update = run_async(world.engine.auto_billing().update_task_status(
        world.user,
        task_id,
        TaskStatus::Completed,
    ))
    .wrap_err("complete task")?;
    world.last_update = Some(update);
    Ok(())
}

#[when("the freelancer tracks {seconds:i64} seconds on the task")]
fn track_time(world: &mut BillingWorld, seconds: i64) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let timer = world.engine.timer();
    run_async(timer.start_timer(StartTimerRequest::new(world.user, task_id)))
        .wrap_err("start timer")?;
    world.clock.advance(seconds);
    run_async(timer.stop_timer(world.user, task_id)).wrap_err("stop timer")?;
    Ok(())
}

#[when("the freelancer deletes the running session")]
fn delete_running_session(world: &mut BillingWorld) -> Result<(), eyre::Report> {
    let entry_id = world
        .running_entry
        .ok_or_else(|| eyre::eyre!("missing running entry in scenario world"))?;
    let result = run_async(world.engine.timer().delete_entry(world.user, entry_id));
    world.last_error = result.err();
    Ok(())
}
