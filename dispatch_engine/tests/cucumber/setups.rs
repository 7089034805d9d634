use cucumber::given;
use dispatch_engine::test_utils::seed::{add_rider, km_north};

use crate::cucumber::{delivery_world::DeliverySystem, DeliveryWorld};

#[given("a fresh campus")]
async fn fresh_campus(world: &mut DeliveryWorld) {
    let system = DeliverySystem::new().await;
    world.system = Some(system);
}

#[given(expr = "rider {word} is online {float} km north of campus")]
async fn online_rider(world: &mut DeliveryWorld, name: String, km: f64) {
    let system = world.system();
    let rider = add_rider(&system.db, &name, Some(km_north(km)), true).await;
    system.api.dispatcher().set_availability(rider.id, true).await.expect("Error bringing rider online");
    world.riders.insert(name, rider.id);
}

#[given(expr = "rider {word} is offline")]
async fn offline_rider(world: &mut DeliveryWorld, name: String) {
    let rider = add_rider(&world.system().db, &name, None, false).await;
    world.riders.insert(name, rider.id);
}
