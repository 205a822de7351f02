use crate::config::{Args, Config, TaskKind};
use color_eyre::eyre::{eyre, Result};
use nalgebra::Matrix3;
use orbital::{
    evaluate_current_and_angular_momentum, evaluate_density, evaluate_orbitals, AngularMomentumOptions, Attachment,
    DensityOptions, EvaluatorConfig, FieldParams, OrbitalOptions, Universe,
};
use tracing::info;

/// Run the configured task, attaching its field to `uni`.
pub fn run_task(uni: &mut Universe, config: &Config, args: &Args) -> Result<()> {
    let task = &config.task;
    let kind = args.task.or(task.kind).unwrap_or(TaskKind::Orbitals);
    let frame = args.frame.unwrap_or(0);
    let field_params = resolve_field_params(config, args, frame);
    let evaluator = EvaluatorConfig {
        fast_path: !args.no_fast_path && task.fast_path.unwrap_or(true),
        verbose: args.verbose || task.verbose.unwrap_or(false),
    };
    let attachment = Attachment {
        inplace: true,
        replace: task.replace.unwrap_or(false),
    };

    match kind {
        TaskKind::Orbitals => {
            info!("\nEvaluating molecular orbitals...");
            let opts = OrbitalOptions {
                field_params: Some(field_params),
                mocoefs: task.mocoefs.clone(),
                vector: task.vector.clone(),
                irrep: task.irrep,
                frame,
                attachment,
                evaluator,
            };
            evaluate_orbitals(uni, &opts)?;
        }
        TaskKind::Density => {
            info!("\nEvaluating electron density...");
            let opts = DensityOptions {
                field_params: Some(field_params),
                mocoefs: task.mocoefs.clone(),
                orbocc: task.orbocc.clone(),
                frame,
                norm: task.norm.unwrap_or_default(),
                attachment,
                evaluator,
            };
            evaluate_density(uni, &opts)?;
        }
        TaskKind::AngularMomentum => {
            info!("\nEvaluating current density and orbital angular momentum...");
            let opts = AngularMomentumOptions {
                field_params: Some(field_params),
                rcoefs: task.rcoefs.clone(),
                icoefs: task.icoefs.clone(),
                orbocc: task.orbocc.clone(),
                frame,
                maxes: task.maxes.map(|rows| Matrix3::from_fn(|i, j| rows[i][j])),
                with_current: task.with_current.unwrap_or(false),
                attachment,
                evaluator,
            };
            evaluate_current_and_angular_momentum(uni, &opts)?;
        }
    }

    if uni.field().is_none() {
        return Err(eyre!("Task {:?} produced no field", kind));
    }
    Ok(())
}

fn resolve_field_params(config: &Config, args: &Args, frame: usize) -> FieldParams {
    let mut params = config.grid.clone().unwrap_or_default().with_defaults();
    if let Some(points) = args.points {
        info!("Overriding grid points per axis with: {}", points);
        params.counts = Some([points; 3]);
    }
    params.frame = Some(frame);
    params
}
