pub mod queue_dto;
