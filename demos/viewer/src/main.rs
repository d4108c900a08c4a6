use std::{cell::RefCell, rc::Rc};

use stage_ngin::{
    SceneOrchestrator,
    context::OrchestratorConfig,
    flow::{self, Deferred},
};

const ASSET: &str = "character.glb";

fn main() -> anyhow::Result<()> {
    flow::run(OrchestratorConfig::default(), |orchestrator, spawner| {
        orchestrator.add_debug_axes(1.0);
        orchestrator.attach_frame_instrumentation();

        let mut frames = 0u64;
        orchestrator.add_frame_hook(move || {
            frames += 1;
            if frames % 600 == 0 {
                log::debug!("{} frames", frames);
            }
        });

        let load = orchestrator.load_asset(ASSET, |percent| log::info!("{}: {:.0}%", ASSET, percent));
        spawner.spawn(async move {
            let result = load.await;
            Box::new(move |orchestrator: &mut SceneOrchestrator| match result {
                Ok(asset) => {
                    let node = Rc::new(RefCell::new(asset.instantiate()));
                    orchestrator.scene_mut().add(Box::new(node.clone()));
                    if let Some(clip) = asset.animations.first() {
                        orchestrator.play_animation(node, &asset.animations, &clip.name);
                    }
                }
                Err(e) => log::error!("{:#}", e),
            }) as Deferred
        });
        Ok(())
    })
}
