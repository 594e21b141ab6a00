//! End-to-end scheduling: frame timing, turn order, deferred removal and
//! sight updates driven through the public API.

use gloam::{
    find_path, AbilityId, Action, ActorKind, Connectivity, AnimationTiming, Decision, GameConfig, GameContext, GameEvent, GameState,
    Grid, LevelDescription, Position, Script, ScriptContext, SpawnRequest, TurnScheduler,
};
use rand::rngs::StdRng;

fn instant_context() -> GameContext {
    GameContext::new(GameConfig {
        timing: AnimationTiming::instant(),
        ..GameConfig::default()
    })
}

#[test]
fn test_queued_moves_play_one_per_animation() {
    let mut state = GameState::new(Grid::new(10, 3).unwrap());
    let player = state
        .spawn_actor(SpawnRequest::new(ActorKind::Player, Position::new(0, 1)))
        .unwrap();
    for x in 1..=5 {
        state
            .actor_mut(player)
            .unwrap()
            .queue_action(Action::move_to(Position::new(x, 1)));
    }

    let mut ctx = GameContext::new(GameConfig::default());
    let dt = ctx.timing().frame_duration;
    let mut scheduler = TurnScheduler::new();
    scheduler.start(&mut state, &mut ctx);

    let mut last = Position::new(0, 1);
    let mut changes = Vec::new();
    for frame in 1..=30 {
        scheduler.update(&mut state, &mut ctx, dt).unwrap();
        let now = state.actor(player).unwrap().position();
        if now != last {
            changes.push(frame);
            last = now;
        }
    }

    assert_eq!(changes, vec![1, 7, 13, 19, 25]);
    assert_eq!(last, Position::new(5, 1));
    state.check_occupancy().unwrap();
}

#[test]
fn test_walk_found_path_to_destination() {
    let mut state = GameState::new(Grid::new(10, 10).unwrap());
    let walker = state
        .spawn_actor(SpawnRequest::new(ActorKind::Player, Position::new(2, 2)))
        .unwrap();
    let blocker = state
        .spawn_actor(SpawnRequest::new(ActorKind::Monster, Position::new(7, 7)))
        .unwrap();

    let path = find_path(
        state.grid(),
        Position::new(2, 2),
        Position::new(7, 7),
        None,
        Connectivity::Eight,
    )
    .unwrap();
    let steps: Vec<Position> = path.iter().collect();
    assert_eq!(steps, (3..=7).map(|n| Position::new(n, n)).collect::<Vec<_>>());
    assert!((path.cost() - 5.0 * std::f64::consts::SQRT_2).abs() < 1e-9);

    // Clear the destination, then walk the route one animation at a time.
    state.erase_actor(blocker).unwrap();
    for step in steps {
        state.actor_mut(walker).unwrap().queue_action(Action::move_to(step));
    }
    let mut ctx = GameContext::new(GameConfig::default());
    let dt = ctx.timing().frame_duration;
    let mut scheduler = TurnScheduler::new();
    scheduler.start(&mut state, &mut ctx);

    let mut arrivals = Vec::new();
    let mut last = Position::new(2, 2);
    for frame in 1..=30 {
        scheduler.update(&mut state, &mut ctx, dt).unwrap();
        let now = state.actor(walker).unwrap().position();
        if now != last {
            arrivals.push(frame);
            last = now;
        }
    }
    assert_eq!(arrivals, vec![1, 7, 13, 19, 25]);
    assert_eq!(last, Position::new(7, 7));
    assert_eq!(state.grid().actor_at(Position::new(7, 7)), Some(walker));
    state.check_occupancy().unwrap();
}

#[test]
fn test_dead_actor_keeps_cell_until_swept() {
    let mut state = GameState::new(Grid::new(8, 3).unwrap());
    let ids: Vec<_> = (0..3)
        .map(|x| {
            state
                .spawn_actor(
                    SpawnRequest::new(ActorKind::Monster, Position::new(x * 2, 1))
                        .with_script("ai/idle"),
                )
                .unwrap()
        })
        .collect();
    let mut ctx = instant_context();
    let mut scheduler = TurnScheduler::new();
    scheduler.start(&mut state, &mut ctx);

    let doomed = Position::new(2, 1);
    assert!(state.damage_actor(ids[1], 100, Some(ids[0])).unwrap());
    assert_eq!(state.grid().actor_at(doomed), Some(ids[1]));
    assert!(state.grid().is_wall(doomed, true));
    state.check_occupancy().unwrap();

    let report = scheduler.update(&mut state, &mut ctx, 0.016).unwrap();
    assert_eq!(report.active, Some(ids[2]));
    assert!(state.actor(ids[1]).is_none());
    assert_eq!(state.grid().actor_at(doomed), None);
    state.check_occupancy().unwrap();

    let events = state.drain_events();
    assert!(events.contains(&GameEvent::ActorRemoved {
        actor: ids[1],
        position: doomed,
    }));
    assert!(!events.contains(&GameEvent::LevelCleared));
    assert_eq!(state.statistics.monsters_defeated, 1);
}

#[test]
fn test_last_monster_clears_level() {
    let mut state = GameState::new(Grid::new(5, 5).unwrap());
    let hero = state
        .spawn_actor(SpawnRequest::new(ActorKind::Hero, Position::new(1, 1)).with_script("ai/idle"))
        .unwrap();
    let monster = state
        .spawn_actor(SpawnRequest::new(ActorKind::Monster, Position::new(3, 3)).with_script("ai/idle"))
        .unwrap();
    let mut ctx = instant_context();
    let mut scheduler = TurnScheduler::new();
    scheduler.start(&mut state, &mut ctx);

    state.damage_actor(monster, 100, Some(hero)).unwrap();
    let report = scheduler.update(&mut state, &mut ctx, 0.016).unwrap();

    assert!(report.new_round);
    assert_eq!(report.active, Some(hero));
    assert_eq!(state.monsters_remaining(), 0);
    assert!(state.drain_events().contains(&GameEvent::LevelCleared));
}

#[derive(Debug)]
struct MarchEast;

impl Script for MarchEast {
    fn decide(&self, ctx: &ScriptContext<'_>, _rng: &mut StdRng) -> Decision {
        Decision::Move(ctx.position().offset(1, 0))
    }
}

#[test]
fn test_registered_script_drives_actor() {
    let mut state = GameState::new(Grid::new(6, 1).unwrap());
    let walker = state
        .spawn_actor(SpawnRequest::new(ActorKind::Monster, Position::new(0, 0)).with_script("test/east"))
        .unwrap();
    let mut ctx = instant_context();
    ctx.scripts.register("test/east", MarchEast);
    let mut scheduler = TurnScheduler::new();
    scheduler.start(&mut state, &mut ctx);

    for _ in 0..3 {
        scheduler.update(&mut state, &mut ctx, 0.016).unwrap();
    }
    assert_eq!(state.actor(walker).unwrap().position(), Position::new(3, 0));
    assert_eq!(scheduler.round(), 4);

    // The east edge stops it; failed moves still spend the turn.
    for _ in 0..5 {
        scheduler.update(&mut state, &mut ctx, 0.016).unwrap();
    }
    assert_eq!(state.actor(walker).unwrap().position(), Position::new(5, 0));
    state.check_occupancy().unwrap();
}

#[test]
fn test_sight_stops_at_walls_and_follows_moves() {
    let text = "\
name = Two Rooms

[terrain]
##########
#....#...#
#........#
##########

[entities]
..........
.@........
..........
..........
";
    let description: LevelDescription = text.parse().unwrap();
    let config = GameConfig::default();
    let mut state = GameState::from_level(description.build().unwrap(), &config).unwrap();
    let player = state.player().unwrap();

    let grid = state.grid();
    assert!(grid.is_discovered(Position::new(1, 1)));
    assert!(grid.is_discovered(Position::new(5, 1)));
    assert!(grid.is_discovered(Position::new(4, 2)));
    assert!(!grid.is_discovered(Position::new(7, 1)));
    assert!(state
        .events()
        .iter()
        .any(|event| matches!(event, GameEvent::CellsRevealed { .. })));

    let mut ctx = instant_context();
    let mut scheduler = TurnScheduler::new();
    scheduler.start(&mut state, &mut ctx);
    for x in 2..=6 {
        state
            .actor_mut(player)
            .unwrap()
            .queue_action(Action::move_to(Position::new(x, 2)));
    }
    for _ in 0..10 {
        scheduler.update(&mut state, &mut ctx, 0.016).unwrap();
    }

    assert_eq!(state.actor(player).unwrap().position(), Position::new(6, 2));
    assert!(state.grid().is_discovered(Position::new(7, 1)));
}

#[test]
fn test_blink_extends_sight() {
    let mut state = GameState::new(Grid::new(14, 3).unwrap());
    let player = state
        .spawn_actor(
            SpawnRequest::new(ActorKind::Player, Position::new(1, 1))
                .with_abilities(&[AbilityId::Blink]),
        )
        .unwrap();
    state.refresh_fov(player, true);
    assert!(state.grid().is_discovered(Position::new(8, 1)));
    assert!(!state.grid().is_discovered(Position::new(11, 1)));

    state
        .actor_mut(player)
        .unwrap()
        .queue_action(Action::use_ability(AbilityId::Blink, Position::new(5, 1)));
    let mut ctx = instant_context();
    let mut scheduler = TurnScheduler::new();
    scheduler.start(&mut state, &mut ctx);
    for _ in 0..4 {
        scheduler.update(&mut state, &mut ctx, 0.016).unwrap();
    }

    assert_eq!(state.actor(player).unwrap().position(), Position::new(5, 1));
    assert!(state.grid().is_discovered(Position::new(11, 1)));
    state.check_occupancy().unwrap();
}

#[test]
fn test_mounting_moves_sight_and_rider_drags_mount() {
    let mut state = GameState::new(Grid::new(14, 3).unwrap());
    let player = state
        .spawn_actor(SpawnRequest::new(ActorKind::Player, Position::new(1, 1)))
        .unwrap();
    let horse = state
        .spawn_actor(SpawnRequest::new(ActorKind::Mount, Position::new(2, 1)).with_script("ai/idle"))
        .unwrap();
    state.refresh_fov(player, true);
    assert!(!state.grid().is_discovered(Position::new(9, 1)));

    state
        .actor_mut(player)
        .unwrap()
        .queue_action(Action::interact(Position::new(2, 1)));
    let mut ctx = instant_context();
    let mut scheduler = TurnScheduler::new();
    scheduler.start(&mut state, &mut ctx);

    scheduler.update(&mut state, &mut ctx, 0.016).unwrap();
    assert_eq!(state.actor(player).unwrap().position(), Position::new(2, 1));
    assert_eq!(state.actor(player).unwrap().mount(), Some(horse));
    assert!(state.grid().is_discovered(Position::new(9, 1)));

    {
        let actor = state.actor_mut(player).unwrap();
        actor.queue_action(Action::move_to(Position::new(3, 1)));
        actor.queue_action(Action::move_to(Position::new(4, 1)));
    }
    for _ in 0..10 {
        scheduler.update(&mut state, &mut ctx, 0.016).unwrap();
    }
    assert_eq!(state.actor(player).unwrap().position(), Position::new(4, 1));
    assert_eq!(state.actor(horse).unwrap().position(), Position::new(4, 1));
    assert_eq!(state.grid().actor_at(Position::new(4, 1)), Some(player));
    assert_eq!(state.grid().actor_at(Position::new(2, 1)), None);
    state.check_occupancy().unwrap();

    let dropped = state.dismount(player).unwrap();
    assert!(dropped.is_adjacent(Position::new(4, 1)));
    assert_eq!(state.grid().actor_at(dropped), Some(horse));
    state.check_occupancy().unwrap();
}
