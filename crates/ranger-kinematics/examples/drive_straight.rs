use ranger_kinematics::*;

fn main() {
    let step_cm = 20.0;
    let num_steps = 5;
    let calibration = DriveCalibration::default();

    let mut current_pose = Pose::new(84.0, 30.0, 0.0);
    let target = Point::new(180.0, 30.0);

    println!("Initializing dead-reckoning run...");
    println!("  {}", calibration);
    println!("  Start Pose:   {}", current_pose);
    println!("  Target:       {}", target);
    println!("  Step:         {} cm", step_cm);
    println!("\nDriving...");

    let turn = current_pose.turn_towards(target);
    if turn != 0.0 {
        let targets = calibration.rotation(turn);
        println!("Turn {:.3} rad -> wheel targets {}", turn, targets);
        current_pose = current_pose.integrate(calibration.odometry(targets));
    }

    for i in 0..num_steps {
        let targets = calibration.translation(step_cm);
        current_pose = current_pose.integrate(calibration.odometry(targets));
        println!(
            "Step {:>2}: targets {} pose {} remaining {:.1} cm",
            i + 1,
            targets,
            current_pose,
            current_pose.distance_to(target)
        );
    }

    println!("\nRun complete.");
    println!("Final Pose: {:?}", current_pose);
}
