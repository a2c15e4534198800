mod gateway_service;
mod scheduler_service;
mod webserver_service;
mod workers_service;

pub use gateway_service::GatewayService;
pub use scheduler_service::SchedulerService;
pub use webserver_service::WebserverService;
pub use workers_service::WorkersService;
