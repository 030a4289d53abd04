//! Drive one survey mission end-to-end against a running server.
//!
//! Registers a drone, plans a square survey around a center point, streams
//! positions along the ring on the live channel and reports progress until
//! the mission completes, then requests a report.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde_json::json;
use std::time::Duration;
use survey_cli::sim::{square_ring, RingPath};
use survey_core::{
    CreateDroneRequest, CreateMissionRequest, FlightParameters, GenerateReportRequest, GeoPoint,
    PositionUpdate, Schedule, ServerEvent, SurveyArea, SurveyPattern,
};
use survey_sdk::SurveyClient;
use tokio::time;

/// Simulate a survey flight (single drone, square area)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Survey Server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Drone serial number (defaults to a timestamped one)
    #[arg(long)]
    serial: Option<String>,

    /// Center longitude (default: UCI)
    #[arg(long, default_value_t = -117.8265, allow_hyphen_values = true)]
    lon: f64,

    /// Center latitude (default: UCI)
    #[arg(long, default_value_t = 33.6846)]
    lat: f64,

    /// Side of the survey square in meters
    #[arg(long, default_value_t = 400.0)]
    side: f64,

    /// Altitude in meters
    #[arg(long, default_value_t = 100.0)]
    altitude: f64,

    /// Speed in meters per second
    #[arg(long, default_value_t = 15.0)]
    speed: f64,

    /// Survey pattern: crosshatch, parallel or perimeter
    #[arg(long, default_value = "perimeter")]
    pattern: String,

    /// Number of position updates along the ring
    #[arg(long, default_value_t = 20)]
    steps: u32,

    /// Update rate in Hz
    #[arg(long, default_value_t = 2.0)]
    rate: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("survey_sim=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let pattern: SurveyPattern = serde_json::from_value(json!(args.pattern))
        .with_context(|| format!("unknown pattern '{}'", args.pattern))?;
    let serial = args
        .serial
        .clone()
        .unwrap_or_else(|| format!("SIM-{}", Utc::now().timestamp_millis()));

    println!("Connecting to Survey Server at {}...", args.url);
    let client = SurveyClient::new(&args.url);

    let drone = client
        .create_drone(&CreateDroneRequest {
            name: format!("Simulator {}", serial),
            serial_number: serial,
            status: None,
            battery_level: Some(100.0),
            location: Some(GeoPoint::new(args.lon, args.lat)),
            specifications: None,
        })
        .await
        .context("failed to register drone")?;
    println!("Registered drone: {} ({})", drone.id, drone.serial_number);

    let ring = square_ring([args.lon, args.lat], args.side);
    let mission = client
        .create_mission(&CreateMissionRequest {
            name: format!("Simulated survey {}", Utc::now().format("%Y-%m-%d %H:%M")),
            survey_area: SurveyArea::from_ring(ring),
            parameters: FlightParameters {
                altitude: args.altitude,
                speed: args.speed,
                overlap: 75.0,
                pattern,
            },
            schedule: Schedule {
                start_time: Utc::now(),
                end_time: None,
                is_recurring: false,
                frequency: None,
            },
            assigned_drone: Some(drone.id.clone()),
        })
        .await
        .context("failed to create mission")?;
    println!(
        "Mission {} is {} (ETA {:.1} min)",
        mission.id, mission.status, mission.eta
    );

    let mut channel = client.connect_channel().await?;
    channel.join(&mission.id).await?;

    // Fly the ring the server planned, which may differ from the one we sent.
    let path = RingPath::new(mission.survey_area.ring().to_vec());
    let steps = args.steps.max(1);
    let period = Duration::from_secs_f64(1.0 / args.rate.max(0.1));
    let mut ticker = time::interval(period);

    for step in 1..=steps {
        ticker.tick().await;
        let fraction = f64::from(step) / f64::from(steps);
        let Some(position) = path.position_at(fraction) else {
            anyhow::bail!("mission {} has an empty survey ring", mission.id);
        };

        let mut payload = serde_json::Map::new();
        payload.insert("droneId".into(), json!(drone.id));
        payload.insert("position".into(), json!(position));
        payload.insert("altitude".into(), json!(args.altitude));
        payload.insert("timestamp".into(), json!(Utc::now()));
        channel
            .publish(PositionUpdate {
                mission_id: mission.id.clone(),
                payload,
            })
            .await?;

        // Our own update comes back because we joined the mission group.
        if let Ok(Ok(Some(ServerEvent::DronePosition(echo)))) =
            time::timeout(Duration::from_millis(250), channel.next_event()).await
        {
            tracing::debug!("Observed position {:?}", echo.payload.get("position"));
        }

        client.set_drone_location(&drone.id, position).await?;
        let progress = (fraction * 100.0).min(100.0);
        let updated = client.update_progress(&mission.id, progress).await?;
        println!(
            "[{:>3}/{}] {:.5}, {:.5} progress {:>5.1}% ETA {:.1} min ({})",
            step, steps, position[1], position[0], updated.progress, updated.eta, updated.status
        );
    }

    channel.leave(&mission.id).await?;
    channel.close().await?;

    let report = client
        .generate_report(&GenerateReportRequest {
            mission_id: mission.id.clone(),
            images: vec![format!("sim/{}/final.jpg", mission.id)],
        })
        .await?;
    println!("Report {}: {}", report.id, report.summary);
    println!(
        "Flight stats: {:.1} min, {:.0} m, {:.0} m2",
        report.flight_stats.duration, report.flight_stats.distance, report.flight_stats.coverage
    );

    let drone = client.get_drone(&drone.id).await?;
    println!("Drone {} is {} again", drone.id, drone.status);
    Ok(())
}
