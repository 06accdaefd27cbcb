use crate::config::TbConfig;
use crate::error::{TbError, TbResult};
use crate::executor::{self, JoinHandle, Task};
use crate::interconnect::Interconnect;
use crate::master::MasterAgent;
use crate::random::{BoolRandomizer, StdRandom};
use crate::report::{speed_line, MasterStats, SlaveStats, TbReport};
use crate::slave::SlaveAgent;
use crate::stream::{StreamDriverMaster, StreamDriverSlave, StreamMonitor};
use crate::tb_obj::TbObj;
use crate::transaction::SLAVE_COUNT;
use crate::trigger::{self, Trigger};
use log::{error, info};
use std::time::Instant;

pub struct Testbench {
    config: TbConfig,
    masters: Vec<TbObj<MasterAgent<StdRandom>>>,
    slaves: Vec<TbObj<SlaveAgent<StdRandom>>>,
    tasks: Vec<JoinHandle>,
}

impl Testbench {
    pub fn new(config: TbConfig) -> TbResult<Self> {
        config.validate()?;
        // a previous run on this thread may have left state behind
        trigger::reset();
        executor::clear_ready_queue();
        crate::take_failure();

        let xbar = Interconnect::new(config.masters, config.max_outstanding, config.queue_depth);
        let seed = config.seed;
        let mut component = 0;
        let mut rng = || {
            component += 1;
            StdRandom::for_component(seed, component)
        };
        let mut tasks = Vec::new();

        let mut masters = Vec::with_capacity(config.masters);
        for i in 0..config.masters {
            let agent = TbObj::new(MasterAgent::new(i, rng(), config.finish_after)?);
            let ar = xbar.master_ar(i);
            let r = xbar.master_r(i);

            let gen = agent.clone();
            tasks.push(StreamDriverMaster::spawn(
                ar,
                move || gen.with_mut(|m| m.generate_read_command()),
                &format!("master{}_ar_driver", i),
            ));
            tasks.push(StreamDriverSlave::spawn(
                r.clone(),
                BoolRandomizer::new(config.randomizer),
                rng(),
                &format!("master{}_r_ready", i),
            ));
            let mon = agent.clone();
            tasks.push(StreamMonitor::spawn(
                r,
                move |beat| mon.with_mut(|m| m.on_read_response(&beat)),
                &format!("master{}_r_monitor", i),
            ));
            masters.push(agent);
        }

        let mut slaves = Vec::with_capacity(SLAVE_COUNT);
        for i in 0..SLAVE_COUNT {
            let agent = TbObj::new(SlaveAgent::new(i, rng(), BoolRandomizer::new(config.randomizer)));
            let ar = xbar.slave_ar(i);
            let r = xbar.slave_r(i);

            tasks.push(StreamDriverSlave::spawn(
                ar.clone(),
                BoolRandomizer::new(config.randomizer),
                rng(),
                &format!("slave{}_ar_ready", i),
            ));
            let mon = agent.clone();
            tasks.push(StreamMonitor::spawn(
                ar,
                move |cmd| mon.with_mut(|s| s.on_read_command(cmd)),
                &format!("slave{}_ar_monitor", i),
            ));
            let gen = agent.clone();
            tasks.push(StreamDriverMaster::spawn(
                r,
                move || gen.with_mut(|s| s.generate_read_response()),
                &format!("slave{}_r_driver", i),
            ));
            slaves.push(agent);
        }

        tasks.push(xbar.spawn());
        if let Some(every) = config.speed_report_cycles {
            tasks.push(spawn_speed_printer(every));
        }
        // every task runs up to its first trigger
        executor::run_once();

        Ok(Self {
            config,
            masters,
            slaves,
            tasks,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.masters.iter().all(|m| m.get().is_complete())
    }

    pub fn run(mut self) -> TbReport {
        let start = Instant::now();
        info!(
            "Starting read interconnect test: seed={}, masters={}, slaves={}",
            self.config.seed, self.config.masters, SLAVE_COUNT
        );
        let verdict = self.run_cycles();
        if let Err(e) = &verdict {
            error!("Test failed at cycle {}: {}", trigger::cycle(), e);
        }
        let report = self.report(verdict, start.elapsed().as_secs_f64());
        self.tear_down();
        info!("Test done: {}", report.result_str());
        report
    }

    fn run_cycles(&self) -> TbResult {
        loop {
            trigger::tick();
            check_failure()?;
            if self.is_complete() {
                break;
            }
            if let Some(max) = self.config.max_cycles {
                if trigger::cycle() >= max {
                    return Err(TbError::Timeout { cycles: max });
                }
            }
        }
        info!("All masters complete at cycle {}", trigger::cycle());
        for _ in 0..self.config.settle_cycles {
            trigger::tick();
            check_failure()?;
        }
        Ok(())
    }

    fn report(&self, verdict: TbResult, wall_secs: f64) -> TbReport {
        TbReport {
            seed: self.config.seed,
            cycles: trigger::cycle(),
            wall_secs,
            masters: self
                .masters
                .iter()
                .map(|m| {
                    let m = m.get();
                    MasterStats {
                        id: m.id(),
                        issued: m.issued(),
                        completed: m.completed(),
                        beats_checked: m.beats_checked(),
                        pending: m.pending(),
                        complete: m.is_complete(),
                    }
                })
                .collect(),
            slaves: self
                .slaves
                .iter()
                .map(|s| {
                    let s = s.get();
                    SlaveStats {
                        id: s.id(),
                        accepted: s.accepted(),
                        beats: s.beats(),
                        stalls: s.stalls(),
                        retired: s.retired(),
                        pending: s.pending(),
                    }
                })
                .collect(),
            verdict,
        }
    }

    fn tear_down(&mut self) {
        for task in self.tasks.drain(..) {
            task.cancel();
        }
        trigger::cancel_all_triggers();
        executor::clear_ready_queue();
    }
}

#[allow(unreachable_code)]
fn spawn_speed_printer(every: u64) -> JoinHandle {
    Task::spawn_from_future(
        async move {
            let mut last = (Instant::now(), trigger::cycle());
            loop {
                Trigger::timer(every).await;
                let now = (Instant::now(), trigger::cycle());
                let secs = now.0.duration_since(last.0).as_secs_f64();
                info!("{}", speed_line(now.1, now.1 - last.1, secs));
                last = now;
            }
            Ok(())
        },
        "speed_printer",
    )
}

fn check_failure() -> TbResult {
    match crate::take_failure() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
