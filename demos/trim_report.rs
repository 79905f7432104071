use fdm_sim::vehicle::{presets, Airplane};

fn report(name: &str, plane: &Airplane) {
    let t = plane.trim();
    let body = plane.model().body();
    println!("{name}");
    println!("  mass           {:>9.1} kg", body.total_mass());
    println!("  CG             {:>9.3} m aft of datum", -body.cg().x);
    println!("  cruise AoA     {:>9.2} deg", t.cruise_aoa.to_degrees());
    println!("  tail incidence {:>9.2} deg", t.tail_incidence.to_degrees());
    println!("  app. elevator  {:>9.3}", t.approach_elevator);
    println!("  drag factor    {:>9.4}", t.drag_factor);
    println!("  lift ratio     {:>9.3}", t.lift_ratio);
    println!("  iterations     {:>9}", t.iterations);
    for (i, g) in plane.model().parts().gears.iter().enumerate() {
        println!("  gear {i}: k {:>10.0} N/m  c {:>8.0} N·s/m", g.spring(), g.damping());
    }
    println!();
}

fn main() {
    env_logger::init();
    for (name, build) in [("Trainer", presets::trainer as fn() -> fdm_sim::Result<Airplane>), ("Jet", presets::jet)] {
        match build() {
            Ok(plane) => report(name, &plane),
            Err(e) => println!("{name}: {e}\n"),
        }
    }
}
